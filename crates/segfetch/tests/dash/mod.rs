mod download;

use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const STREAM_MPD: &str = include_str!("../fixtures/dash/stream.mpd");

/// Serves `body` as `/content/stream.mpd` and returns the manifest URL.
async fn setup_mock_server(body: &str) -> (String, MockServer) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/content/stream.mpd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    (
        format!("{}/content/stream.mpd", mock_server.uri()),
        mock_server,
    )
}

async fn mount_segment(server: &MockServer, segment_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(segment_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}
