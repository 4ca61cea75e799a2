//! HTTP client
//!
//! Provides the two remote operations the pipeline needs:
//! - HEAD lookups that report a resource's `Content-Length`
//! - Streaming downloads of source documents to disk

use super::throttle::Throttle;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// File name used when a URL has no usable last path segment
const FALLBACK_DOWNLOAD_NAME: &str = "download";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Shared request rate limit; `None` is unthrottled
    pub requests_per_second: Option<u32>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("toc-ingest/{}", env!("CARGO_PKG_VERSION")),
            requests_per_second: None,
        }
    }
}

impl HttpClientConfig {
    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Throttle requests
    #[must_use]
    pub fn requests_per_second(mut self, rate: u32) -> Self {
        self.requests_per_second = Some(rate);
        self
    }
}

/// HTTP client shared by lookups and downloads
///
/// Cloning is cheap; clones share the connection pool and the throttle.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    throttle: Option<Throttle>,
}

impl HttpClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        // Redirects are followed by the default policy
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()?;
        let throttle = config.requests_per_second.and_then(Throttle::per_second);

        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    /// Issue a single HEAD request and read `Content-Length`
    ///
    /// `Ok(None)` means the server answered without the header.
    pub async fn head_content_length(&self, url: &str) -> Result<Option<u64>> {
        let response = self.send(self.client.head(url), url).await?;
        let length = content_length(response.headers());
        debug!(url, ?length, "HEAD completed");
        Ok(length)
    }

    /// Stream a remote document into `dest_dir`
    ///
    /// Returns the written path and its size in bytes.
    pub async fn download(&self, url: &str, dest_dir: impl AsRef<Path>) -> Result<(PathBuf, u64)> {
        let parsed = Url::parse(url)?;
        let dest_dir = dest_dir.as_ref();
        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(download_file_name(&parsed));

        info!(url, dest = %dest.display(), "Downloading");
        let mut response = self.send(self.client.get(parsed), url).await?;

        let mut file = tokio::fs::File::create(&dest).await?;
        let mut total = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_error(e))? {
            file.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        file.flush().await?;

        info!(dest = %dest.display(), bytes = total, "Download complete");
        Ok((dest, total))
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Response> {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let response = request
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn map_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(e)
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

/// Parse the `Content-Length` header, if present and numeric
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Local file name for a downloaded URL: its last non-empty path segment
pub fn download_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|s| *s != "." && *s != "..")
        .map_or_else(|| FALLBACK_DOWNLOAD_NAME.to_string(), str::to_string)
}
