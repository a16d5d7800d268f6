use std::path::PathBuf;

use clap::Parser;
use clap_handler::handler;
use segfetch::{BucketMirror, MirrorConfig, Url};

use super::HttpOptions;

const DEFAULT_BUCKET_URL: &str = "http://storage.googleapis.com/aom-test-data/";

/// Download the files of a bucket listing that are not present locally
#[derive(Parser, Clone, Debug)]
#[clap(name = "mirror")]
pub struct MirrorCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    /// Only download keys ending with this suffix
    #[clap(long, default_value = segfetch::mirror::DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Directory to mirror into
    #[clap(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Bucket URL serving the XML listing
    #[clap(default_value = DEFAULT_BUCKET_URL)]
    pub url: Url,
}

impl MirrorCommand {
    pub async fn mirror(self) -> anyhow::Result<()> {
        let client = self.http.into_client()?;
        let config = MirrorConfig::new(self.url)
            .with_suffix(self.suffix)
            .with_target_dir(self.dir);

        let report = BucketMirror::new(client, &config).mirror().await?;
        let bytes: u64 = report.downloaded.iter().map(|(_, bytes)| bytes).sum();
        tracing::info!(
            "{} downloaded ({bytes} bytes), {} skipped, {} failed",
            report.downloaded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        if !report.failed.is_empty() {
            tracing::warn!("Failed to download {} file(s):", report.failed.len());
            for (key, reason) in &report.failed {
                tracing::warn!("  - {key}: {reason}");
            }
        }

        Ok(())
    }
}

#[handler(MirrorCommand)]
pub async fn mirror(args: MirrorCommand) -> anyhow::Result<()> {
    args.mirror().await
}
