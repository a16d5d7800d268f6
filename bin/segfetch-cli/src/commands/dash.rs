use std::path::PathBuf;

use clap::Parser;
use clap_handler::handler;
use segfetch::{download_manifest, mpd::Manifest, DashDownloadConfig, Url};

use super::HttpOptions;

const DEFAULT_MANIFEST_URL: &str =
    "https://bitmovin-a.akamaihd.net/webpages/demos/content/av1/chrome/stream.mpd";

/// Download one video track of an MPEG-DASH manifest into a single file
#[derive(Parser, Clone, Debug)]
#[clap(name = "dash", visible_alias = "mpd")]
pub struct DashCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    /// Index of the track to download, in manifest order
    #[clap(short, long = "track", default_value = "0")]
    pub track_index: usize,

    /// Output file path
    #[clap(short, long, default_value = "fetchmpd.webm")]
    pub output: PathBuf,

    /// Mime type of the adaptation set to choose tracks from
    #[clap(long, default_value = segfetch::mpd::DEFAULT_MIME_TYPE)]
    pub mime_type: String,

    /// List tracks and exit
    #[clap(short, long)]
    pub list: bool,

    /// Manifest URL
    #[clap(default_value = DEFAULT_MANIFEST_URL)]
    pub url: Url,
}

impl DashCommand {
    pub async fn download(self) -> anyhow::Result<()> {
        let client = self.http.into_client()?;

        if self.list {
            let manifest = Manifest::fetch(&client, &self.url, &self.mime_type).await?;
            println!("MPD duration={}", manifest.duration);
            for (i, track) in manifest.tracks.iter().enumerate() {
                let mark = if i == self.track_index { '*' } else { ' ' };
                println!("{mark}{i}: {track}");
            }
            return Ok(());
        }

        let config = DashDownloadConfig::new(self.url, self.track_index, self.output)
            .with_mime_type(self.mime_type);
        let summary = download_manifest(&client, &config).await?;
        tracing::info!(
            "Downloaded {} segments of track #{} to {}",
            summary.segments,
            summary.track_index,
            summary.output.display()
        );

        Ok(())
    }
}

#[handler(DashCommand)]
pub async fn dash(args: DashCommand) -> anyhow::Result<()> {
    args.download().await
}
