use segfetch::{
    download::{download_segments, download_segments_to_file},
    download_manifest,
    template::MediaTemplate,
    DashDownloadConfig, HttpClient, Manifest, SegfetchError, Track, Url,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use super::{mount_segment, setup_mock_server, STREAM_MPD};
use crate::{init_test_tracing, requested_paths, AssertWrapper};

const INIT: &[u8] = b"webm-init-header";
const SEGMENTS: [&[u8]; 3] = [b"cluster-one", b"cluster-two!", b"cluster-three"];

#[tokio::test]
async fn test_parse_fetched_manifest() -> anyhow::Result<()> {
    let (manifest_uri, server) = setup_mock_server(STREAM_MPD).await;
    let manifest_url = Url::parse(&manifest_uri)?;

    let manifest = Manifest::fetch(&HttpClient::default(), &manifest_url, "video/webm").await?;
    assert_eq!(manifest.duration, 12.0);
    assert_eq!(manifest.tracks.len(), 2);
    assert_eq!(manifest.tracks[0].bandwidth, 2000000);
    assert_eq!(manifest.tracks[1].bandwidth, 800000);
    assert_eq!(
        manifest.tracks[1].initialization,
        manifest_url.join("video/720p/init.webm")?
    );
    assert_eq!(
        manifest.tracks[1].media.to_string(),
        format!("{}/content/video/720p/segment_$Number$.webm", server.uri())
    );

    let audio = Manifest::fetch(&HttpClient::default(), &manifest_url, "audio/webm").await;
    // audio representations carry no resolution
    assert!(matches!(
        audio,
        Err(SegfetchError::MissingField { field: "width", .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_download_manifest_track() -> anyhow::Result<()> {
    init_test_tracing();
    let (manifest_uri, server) = setup_mock_server(STREAM_MPD).await;
    mount_segment(&server, "/content/video/1080p/init.webm", INIT).await;
    for (i, body) in SEGMENTS.iter().enumerate() {
        let segment_path = format!("/content/video/1080p/segment_{}.webm", i + 1);
        mount_segment(&server, &segment_path, body).await;
    }

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("fetchmpd.webm");
    let config = DashDownloadConfig::new(Url::parse(&manifest_uri)?, 0, &output);
    let summary = download_manifest(&HttpClient::default(), &config).await?;

    assert_eq!(summary.track_index, 0);
    // 12s / (4000 / 1000)
    assert_eq!(summary.segments, 3);

    let expected: Vec<u8> = [INIT, SEGMENTS[0], SEGMENTS[1], SEGMENTS[2]].concat();
    assert_eq!(summary.bytes_written, expected.len() as u64);
    assert_eq!(std::fs::read(&output)?, expected);

    assert_eq!(
        requested_paths(&server).await,
        vec![
            "/content/stream.mpd",
            "/content/video/1080p/init.webm",
            "/content/video/1080p/segment_1.webm",
            "/content/video/1080p/segment_2.webm",
            "/content/video/1080p/segment_3.webm",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_keeps_written_segments() -> anyhow::Result<()> {
    let (manifest_uri, server) = setup_mock_server(STREAM_MPD).await;
    mount_segment(&server, "/content/video/720p/init.webm", INIT).await;
    mount_segment(&server, "/content/video/720p/segment_1.webm", SEGMENTS[0]).await;
    Mock::given(method("GET"))
        .and(path("/content/video/720p/segment_2.webm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_segment(&server, "/content/video/720p/segment_3.webm", SEGMENTS[2]).await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("partial.webm");
    let config = DashDownloadConfig::new(Url::parse(&manifest_uri)?, 1, &output);
    let error = download_manifest(&HttpClient::default(), &config)
        .await
        .unwrap_err();

    assert!(error.is_fetch_error());
    assert_eq!(error.status().map(|s| s.as_u16()), Some(404));
    let failed_url = error.url().assert_success();
    assert_eq!(failed_url.path(), "/content/video/720p/segment_2.webm");

    // init and the first segment stay on disk
    assert_eq!(std::fs::read(&output)?, [INIT, SEGMENTS[0]].concat());
    assert!(!requested_paths(&server)
        .await
        .contains(&"/content/video/720p/segment_3.webm".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_track_index_out_of_range() -> anyhow::Result<()> {
    let (manifest_uri, server) = setup_mock_server(STREAM_MPD).await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("missing.webm");
    let config = DashDownloadConfig::new(Url::parse(&manifest_uri)?, 2, &output);
    let result = download_manifest(&HttpClient::default(), &config).await;

    assert!(matches!(
        result,
        Err(SegfetchError::TrackIndexOutOfRange { index: 2, count: 2 })
    ));
    assert!(!output.exists());
    assert_eq!(requested_paths(&server).await.len(), 1);

    Ok(())
}

fn numbered_track(server: &MockServer, start_number: u64, media: &str) -> Track {
    let base = Url::parse(&format!("{}/track/", server.uri())).unwrap();
    Track {
        id: None,
        bandwidth: 1,
        width: 16,
        height: 16,
        frame_rate: "30".to_string(),
        codecs: "av01.0.00M.08".to_string(),
        media: MediaTemplate::new(base.join(media).unwrap().as_str()).unwrap(),
        initialization: base.join("init.webm").unwrap(),
        segment_duration: 1,
        start_number,
        timescale: 1,
    }
}

#[tokio::test]
async fn test_download_segments_from_start_number() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_segment(&server, "/track/init.webm", b"I").await;
    mount_segment(&server, "/track/00005.webm", b"five").await;
    mount_segment(&server, "/track/00006.webm", b"six").await;

    let track = numbered_track(&server, 5, "$Number%05d$.webm");
    let mut output = Vec::new();
    let written = download_segments(&HttpClient::default(), &track, 2, &mut output).await?;

    assert_eq!(written, 8);
    assert_eq!(output, b"Ifivesix");
    assert_eq!(
        requested_paths(&server).await,
        vec!["/track/init.webm", "/track/00005.webm", "/track/00006.webm"]
    );

    Ok(())
}

#[tokio::test]
async fn test_zero_segments_writes_init_only() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_segment(&server, "/track/init.webm", INIT).await;

    let track = numbered_track(&server, 1, "seg-$Number$.webm");
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("init-only.webm");
    let written = download_segments_to_file(&HttpClient::default(), &track, 0, &output).await?;

    assert_eq!(written, INIT.len() as u64);
    assert_eq!(std::fs::read(&output)?, INIT);

    Ok(())
}

#[tokio::test]
async fn test_segment_numbers_past_u64_rejected() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_segment(&server, "/track/init.webm", INIT).await;

    let track = numbered_track(&server, u64::MAX, "seg-$Number$.webm");
    let mut output = Vec::new();
    let result = download_segments(&HttpClient::default(), &track, 2, &mut output).await;

    assert!(matches!(
        result,
        Err(SegfetchError::InvalidAttribute {
            field: "startNumber",
            ..
        })
    ));
    assert!(output.is_empty());
    assert!(requested_paths(&server).await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_retry_failed_segment() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_segment(&server, "/track/init.webm", b"I").await;
    Mock::given(method("GET"))
        .and(path("/track/seg-1.webm"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_segment(&server, "/track/seg-1.webm", b"one").await;

    let track = numbered_track(&server, 1, "seg-$Number$.webm");
    let mut output = Vec::new();

    // without retries the first 503 is final
    let result = download_segments(&HttpClient::default(), &track, 1, &mut output).await;
    assert!(result.is_err());

    Mock::given(method("GET"))
        .and(path("/track/seg-2.webm"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_segment(&server, "/track/seg-2.webm", b"two").await;

    let track = numbered_track(&server, 2, "seg-$Number$.webm");
    let mut output = Vec::new();
    let client = HttpClient::default().with_retries(1);
    let written = download_segments(&client, &track, 1, &mut output).await?;
    assert_eq!(written, 4);
    assert_eq!(output, b"Itwo");

    Ok(())
}
