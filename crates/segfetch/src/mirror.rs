use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
};
use url::Url;

use crate::{
    download::write_response,
    http::HttpClient,
    url::object_url,
    SegfetchResult,
};

pub const DEFAULT_SUFFIX: &str = ".ivf";

const LISTING_ACCEPT: &str = "application/xml";

/// Inputs of the bucket mirror flow.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Root of the bucket, its listing is served at this URL
    pub bucket_url: Url,
    pub suffix: String,
    pub target_dir: PathBuf,
}

impl MirrorConfig {
    pub fn new(bucket_url: Url) -> Self {
        Self {
            bucket_url,
            suffix: DEFAULT_SUFFIX.to_string(),
            target_dir: PathBuf::from("."),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = target_dir.into();
        self
    }
}

#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Keys fetched in this run, with the number of bytes transferred
    pub downloaded: Vec<(String, u64)>,
    /// Keys already present locally
    pub skipped: Vec<String>,
    /// Keys that could not be fetched, with the reason
    pub failed: Vec<(String, String)>,
}

/// `ListBucketResult` document in the `http://doc.s3.amazonaws.com/2006-03-01` namespace.
#[derive(Debug, Deserialize)]
struct ListBucketResult {
    #[serde(rename = "Contents", default)]
    contents: Vec<Contents>,
    #[serde(rename = "IsTruncated")]
    is_truncated: Option<bool>,
    #[serde(rename = "NextMarker")]
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key: String,
}

pub struct BucketMirror {
    client: HttpClient,
    bucket: Url,
    suffix: String,
    target_dir: PathBuf,
}

impl BucketMirror {
    pub fn new(client: HttpClient, config: &MirrorConfig) -> Self {
        Self {
            client,
            bucket: config.bucket_url.clone(),
            suffix: config.suffix.clone(),
            target_dir: config.target_dir.clone(),
        }
    }

    /// Lists every key of the bucket, following truncated listings.
    pub async fn list_keys(&self) -> SegfetchResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = self.bucket.clone();
            if let Some(marker) = marker.as_deref() {
                url.query_pairs_mut().append_pair("marker", marker);
            }

            let text = self.client.fetch_text(&url, LISTING_ACCEPT).await?;
            let listing: ListBucketResult = quick_xml::de::from_str(&text)?;
            let page_len = listing.contents.len();
            let last_key = listing.contents.last().map(|c| c.key.clone());
            keys.extend(listing.contents.into_iter().map(|c| c.key));
            tracing::debug!(page_len, total = keys.len(), "Fetched bucket listing page");

            if listing.is_truncated != Some(true) {
                break;
            }
            match listing.next_marker.or(last_key) {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                _ => {
                    tracing::warn!("Truncated listing without a usable marker, stop listing.");
                    break;
                }
            }
        }

        Ok(keys)
    }

    /// Downloads every key with the configured suffix that is not present locally yet.
    ///
    /// Per-key failures are reported and do not stop the run; a listing failure does.
    pub async fn mirror(&self) -> SegfetchResult<MirrorReport> {
        let mut report = MirrorReport::default();

        for key in self.list_keys().await? {
            if !key.ends_with(&self.suffix) {
                continue;
            }

            let Some(path) = self.local_path(&key) else {
                tracing::warn!("{key} is not a relative path, ignoring.");
                continue;
            };
            if tokio::fs::try_exists(&path).await? {
                tracing::info!("{key} skipped");
                report.skipped.push(key);
                continue;
            }

            match self.download_object(&key, &path).await {
                Ok(written) => report.downloaded.push((key, written)),
                Err(e) => {
                    match e.status() {
                        Some(status) => tracing::warn!("{key} {}", status.as_u16()),
                        None => tracing::warn!("{key} failed: {e}"),
                    }
                    report.failed.push((key, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    fn local_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        is_plain.then(|| self.target_dir.join(relative))
    }

    async fn download_object(&self, key: &str, path: &Path) -> SegfetchResult<u64> {
        let url = object_url(&self.bucket, key);
        let response = self.client.fetch(&url).await?;
        let content_length = response.content_length();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut part = path.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let result = async {
            let mut writer = BufWriter::new(File::create(&part).await?);
            let written = write_response(&url, response, &mut writer).await?;
            writer.flush().await?;
            SegfetchResult::Ok(written)
        }
        .await;

        match result {
            Ok(written) => {
                tokio::fs::rename(&part, path).await?;
                match content_length {
                    Some(length) => tracing::info!("{key} done({length})"),
                    None => tracing::info!("{key} done({written})"),
                }
                Ok(written)
            }
            Err(e) => {
                _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}
