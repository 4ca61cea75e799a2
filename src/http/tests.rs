//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH};
use std::time::Duration;
use tempfile::TempDir;
use test_case::test_case;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_timeout(timeout: Duration) -> HttpClient {
    HttpClient::with_config(HttpClientConfig::default().timeout(timeout)).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.user_agent.starts_with("toc-ingest/"));
    assert!(config.requests_per_second.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::default()
        .timeout(Duration::from_secs(5))
        .user_agent("test-agent/1.0")
        .requests_per_second(20);
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.user_agent, "test-agent/1.0");
    assert_eq!(config.requests_per_second, Some(20));

    let client = HttpClient::with_config(config).unwrap();
    assert!(format!("{client:?}").contains("requests_per_second: Some(20)"));
    assert!(format!("{client:?}").contains("Throttle {"));
    assert!(format!("{:?}", HttpClient::new().unwrap()).contains("throttle: None"));
}

// ============================================================================
// Header Parsing Tests
// ============================================================================

#[test_case(Some("1234"), Some(1234) ; "numeric")]
#[test_case(Some(" 42 "), Some(42) ; "padded")]
#[test_case(Some("abc"), None ; "not a number")]
#[test_case(Some("-1"), None ; "negative")]
#[test_case(None, None ; "missing")]
fn test_content_length(value: Option<&'static str>, expected: Option<u64>) {
    let mut headers = HeaderMap::new();
    if let Some(value) = value {
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static(value));
    }
    assert_eq!(content_length(&headers), expected);
}

#[test_case("https://h/files/index.json.gz", "index.json.gz" ; "last segment")]
#[test_case("https://h/files/index.json?sig=1", "index.json" ; "query ignored")]
#[test_case("https://h/files/", "files" ; "trailing slash")]
#[test_case("https://h/", "download" ; "no segments")]
fn test_download_file_name(url: &str, expected: &str) {
    assert_eq!(download_file_name(&Url::parse(url).unwrap()), expected);
}

// ============================================================================
// HEAD Lookup Tests
// ============================================================================

#[tokio::test]
async fn test_head_reports_content_length() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/files/a.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1234]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let size = client
        .head_content_length(&format!("{}/files/a.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(size, Some(1234));
}

#[tokio::test]
async fn test_head_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/moved"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/real", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/real"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 77]))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let size = client
        .head_content_length(&format!("{}/moved", server.uri()))
        .await
        .unwrap();
    assert_eq!(size, Some(77));
}

#[tokio::test]
async fn test_head_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let err = client
        .head_content_length(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_head_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_millis(50));
    let err = client
        .head_content_length(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

// ============================================================================
// Download Tests
// ============================================================================

#[tokio::test]
async fn test_download_streams_body_to_file() {
    let server = MockServer::start().await;
    let body = br#"{"reporting_structure": []}"#.repeat(1000);
    Mock::given(method("GET"))
        .and(path("/toc/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest_dir = dir.path().join("downloads");
    let client = client_with_timeout(Duration::from_secs(5));
    let (dest, bytes) = client
        .download(&format!("{}/toc/index.json", server.uri()), &dest_dir)
        .await
        .unwrap();

    assert_eq!(dest, dest_dir.join("index.json"));
    assert_eq!(bytes, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn test_download_error_status_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_with_timeout(Duration::from_secs(5));
    let err = client
        .download(&format!("{}/toc/index.json", server.uri()), dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    assert!(!dir.path().join("index.json").exists());
}

#[tokio::test]
async fn test_download_rejects_invalid_url() {
    let dir = TempDir::new().unwrap();
    let client = client_with_timeout(Duration::from_secs(1));
    let err = client.download("not a url", dir.path()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

// ============================================================================
// Throttle Tests
// ============================================================================

#[test]
fn test_throttle_zero_is_unthrottled() {
    assert!(Throttle::per_second(0).is_none());
    assert!(Throttle::per_second(5).is_some());
}

#[tokio::test]
async fn test_throttle_allows_burst_then_limits() {
    let throttle = Throttle::per_second(3).unwrap();
    let wait = Duration::from_millis(50);
    for _ in 0..3 {
        assert!(tokio::time::timeout(wait, throttle.acquire()).await.is_ok());
    }
    assert!(tokio::time::timeout(wait, throttle.acquire()).await.is_err());

    // Clones share the bucket
    let clone = throttle.clone();
    assert!(tokio::time::timeout(wait, clone.acquire()).await.is_err());
}
