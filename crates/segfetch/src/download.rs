use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Response;
use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
};
use url::Url;

use crate::{
    error::{SegfetchError, SegfetchResult},
    http::HttpClient,
    mpd::{Manifest, Track, DEFAULT_MIME_TYPE},
};

/// Inputs of the segmented media flow.
#[derive(Debug, Clone)]
pub struct DashDownloadConfig {
    pub manifest_url: Url,
    pub track_index: usize,
    pub output: PathBuf,
    /// `AdaptationSet@mimeType` of the candidate tracks
    pub mime_type: String,
}

impl DashDownloadConfig {
    pub fn new(manifest_url: Url, track_index: usize, output: impl Into<PathBuf>) -> Self {
        Self {
            manifest_url,
            track_index,
            output: output.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSummary {
    pub track_index: usize,
    pub segments: u64,
    pub bytes_written: u64,
    pub output: PathBuf,
}

/// Fetches the manifest, selects the configured track and downloads it into one file.
pub async fn download_manifest(
    client: &HttpClient,
    config: &DashDownloadConfig,
) -> SegfetchResult<DownloadSummary> {
    tracing::info!("URL: {}", config.manifest_url);
    let manifest = Manifest::fetch(client, &config.manifest_url, &config.mime_type).await?;
    tracing::info!("MPD duration={}", manifest.duration);
    for (i, track) in manifest.tracks.iter().enumerate() {
        let mark = if i == config.track_index { '*' } else { ' ' };
        tracing::info!("{mark}{i}: {track}");
    }

    let track = manifest.track(config.track_index)?;
    let segments = track.segment_count(manifest.duration);
    tracing::info!(
        "download #{} ({segments} segments) to \"{}\"",
        config.track_index,
        config.output.display()
    );

    let bytes_written = download_segments_to_file(client, track, segments, &config.output).await?;
    tracing::info!("write {bytes_written} bytes");

    Ok(DownloadSummary {
        track_index: config.track_index,
        segments,
        bytes_written,
        output: config.output.clone(),
    })
}

/// Creates (or truncates) `path` and writes the track into it.
///
/// On failure the bytes written so far are kept.
pub async fn download_segments_to_file<P>(
    client: &HttpClient,
    track: &Track,
    count: u64,
    path: P,
) -> SegfetchResult<u64>
where
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref()).await?;
    let mut writer = BufWriter::new(file);

    let result = download_segments(client, track, count, &mut writer).await;
    // keep whatever was fetched before a failure
    let flushed = writer.flush().await;
    let written = result?;
    flushed?;
    Ok(written)
}

/// Writes the initialization segment of `track` followed by `count` media segments,
/// starting from `Track::start_number`, to `writer`.
///
/// Segments are fetched one after another and in order. Returns the number of bytes written.
pub async fn download_segments<W>(
    client: &HttpClient,
    track: &Track,
    count: u64,
    writer: &mut W,
) -> SegfetchResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let end = track
        .start_number
        .checked_add(count)
        .ok_or_else(|| SegfetchError::InvalidAttribute {
            element: match &track.id {
                Some(id) => format!("Representation(id={id})"),
                None => "Representation".to_string(),
            },
            field: "startNumber",
            value: track.start_number.to_string(),
        })?;

    tracing::info!("{}", track.initialization);
    let response = client.fetch(&track.initialization).await?;
    let mut written = write_response(&track.initialization, response, writer).await?;

    for number in track.start_number..end {
        let url = track.media_url(number)?;
        tracing::info!(segment = number, "{url}");
        let response = client.fetch(&url).await?;
        written += write_response(&url, response, writer).await?;
    }

    writer.flush().await?;
    Ok(written)
}

/// Streams a response body into `writer`, returning the number of bytes copied.
pub(crate) async fn write_response<W>(
    url: &Url,
    response: Response,
    writer: &mut W,
) -> SegfetchResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| SegfetchError::RequestError {
            url: url.clone(),
            source,
        })?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    Ok(written)
}
