//! Integration tests for the HTTP transport.
//!
//! These tests verify the streaming download flow against mock HTTP servers.

use std::sync::Mutex;
use std::time::Duration;

use avfetch_core::download::{DownloadError, HttpTransport, Transport};
use avfetch_core::media::StreamDescriptor;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_mock_file(path_str: &str, content: &[u8]) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(&mock_server)
        .await;

    mock_server
}

#[tokio::test]
async fn test_download_full_flow_preserves_content() {
    let content = b"video bytes, video bytes, video bytes";
    let mock_server = setup_mock_file("/v720.webm", content).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let destination = temp_dir.path().join("Clip [Video].webm");

    let transport = HttpTransport::new().expect("client builds");
    let descriptor = StreamDescriptor::video(
        "720p",
        "video/webm",
        0,
        format!("{}/v720.webm", mock_server.uri()),
    );
    let written = transport
        .download(&descriptor, &destination, &|_, _| {})
        .await
        .expect("download should succeed");

    assert_eq!(written, content.len() as u64);
    assert_eq!(std::fs::read(&destination).unwrap(), content);
}

#[tokio::test]
async fn test_download_reports_progress_up_to_total() {
    let content = vec![7u8; 64 * 1024];
    let mock_server = setup_mock_file("/a.webm", &content).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("Clip [Audio].webm");

    let calls = Mutex::new(Vec::new());
    let transport = HttpTransport::new().unwrap();
    let descriptor =
        StreamDescriptor::audio("audio/webm", 0, format!("{}/a.webm", mock_server.uri()));
    transport
        .download(&descriptor, &destination, &|done, total| {
            calls.lock().unwrap().push((done, total));
        })
        .await
        .unwrap();

    let calls = calls.into_inner().unwrap();
    assert!(!calls.is_empty());
    assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(
        calls.last().copied(),
        Some((content.len() as u64, content.len() as u64))
    );
}

#[tokio::test]
async fn test_download_sends_user_agent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let transport = HttpTransport::new().unwrap();
    let descriptor = StreamDescriptor::audio("audio/mp4", 0, format!("{}/ua", mock_server.uri()));
    transport
        .download(&descriptor, &temp_dir.path().join("ua.mp4"), &|_, _| {})
        .await
        .unwrap();
}

#[tokio::test]
async fn test_download_http_404_returns_status_error_without_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.webm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("Clip [Video].webm");
    let transport = HttpTransport::new().unwrap();
    let descriptor = StreamDescriptor::video(
        "720p",
        "video/webm",
        0,
        format!("{}/missing.webm", mock_server.uri()),
    );

    let result = transport
        .download(&descriptor, &destination, &|_, _| {})
        .await;

    match result {
        Err(DownloadError::HttpStatus { status, url }) => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/missing.webm"));
        }
        other => panic!("expected HttpStatus error, got {other:?}"),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_download_http_500_returns_status_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let transport = HttpTransport::new().unwrap();
    let descriptor = StreamDescriptor::audio("audio/mp4", 0, format!("{}/a", mock_server.uri()));

    let result = transport
        .download(&descriptor, &temp_dir.path().join("a.mp4"), &|_, _| {})
        .await;
    assert!(matches!(
        result,
        Err(DownloadError::HttpStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_download_connection_refused_is_network_error() {
    // Nothing listens on port 9 of localhost in test environments.
    let temp_dir = TempDir::new().unwrap();
    let transport = HttpTransport::new().unwrap();
    let descriptor = StreamDescriptor::audio("audio/mp4", 0, "http://127.0.0.1:9/a.mp4");

    let result = transport
        .download(&descriptor, &temp_dir.path().join("a.mp4"), &|_, _| {})
        .await;
    assert!(matches!(
        result,
        Err(DownloadError::Network { .. } | DownloadError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_download_overwrites_existing_partial_file() {
    let content = b"fresh";
    let mock_server = setup_mock_file("/v.mp4", content).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("Clip [Video].mp4");
    std::fs::write(&destination, b"stale partial content from an earlier attempt").unwrap();

    let transport = HttpTransport::new().unwrap();
    let descriptor =
        StreamDescriptor::video("720p", "video/mp4", 0, format!("{}/v.mp4", mock_server.uri()));
    transport
        .download(&descriptor, &destination, &|_, _| {})
        .await
        .unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), content);
}

/// Serves one response whose body arrives a byte at a time, `gap` apart,
/// after an initial `stall`.
async fn drip_server(body_len: usize, stall: Duration, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        let head = format!("HTTP/1.1 200 OK\r\ncontent-length: {body_len}\r\n\r\n");
        socket.write_all(head.as_bytes()).await.unwrap();
        tokio::time::sleep(stall).await;
        for _ in 0..body_len {
            if socket.write_all(b"x").await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(gap).await;
        }
    });
    format!("http://{addr}/v.webm")
}

#[tokio::test]
async fn test_download_slow_steady_body_outlasts_read_timeout() {
    // 8 bytes, 250 ms apart: 2 s in total against a 1 s read-idle timeout.
    let url = drip_server(8, Duration::ZERO, Duration::from_millis(250)).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("Clip [Video].webm");

    let transport = HttpTransport::with_timeouts(30, 1).unwrap();
    let descriptor = StreamDescriptor::video("720p", "video/webm", 0, url);
    let written = transport
        .download(&descriptor, &destination, &|_, _| {})
        .await
        .unwrap();

    assert_eq!(written, 8);
    assert_eq!(std::fs::read(&destination).unwrap(), b"xxxxxxxx");
}

#[tokio::test]
async fn test_download_stalled_body_times_out() {
    let url = drip_server(4, Duration::from_secs(3), Duration::ZERO).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("Clip [Video].webm");

    let transport = HttpTransport::with_timeouts(30, 1).unwrap();
    let descriptor = StreamDescriptor::video("720p", "video/webm", 0, url);
    let result = transport
        .download(&descriptor, &destination, &|_, _| {})
        .await;

    assert!(matches!(result, Err(DownloadError::Timeout { .. })));
    assert!(!destination.exists());
}
