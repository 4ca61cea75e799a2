//! Enrichment types

use crate::error::Error;
use crate::http::HttpClient;
use crate::transform::Row;
use async_trait::async_trait;

/// Remark for a response without a length header
pub const MISSING_LENGTH_REMARK: &str = "Content-Length not available in headers";

/// Remark for rows when lookups are switched off
pub const DISABLED_REMARK: &str = "size lookup disabled";

/// Outcome of one size lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeLookup {
    /// Byte length, when known
    pub size: Option<u64>,
    /// Empty on success, otherwise why the size is missing
    pub remark: String,
    /// No lookup was attempted
    pub skipped: bool,
}

impl SizeLookup {
    /// Successful lookup
    pub fn found(size: u64) -> Self {
        Self {
            size: Some(size),
            remark: String::new(),
            skipped: false,
        }
    }

    /// Lookup without a size
    pub fn missing(remark: impl Into<String>) -> Self {
        Self {
            size: None,
            remark: remark.into(),
            skipped: false,
        }
    }

    /// No lookup made; not a failure
    pub fn skipped(remark: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::missing(remark)
        }
    }

    /// Lookup that failed with an error
    pub fn failed(error: &Error) -> Self {
        Self::missing(format!("Error: {error}"))
    }

    /// Whether a size was found
    pub fn is_found(&self) -> bool {
        self.size.is_some()
    }
}

/// Resolves the remote byte size of a URL
///
/// Implementations make exactly one attempt and report failure through the
/// remark rather than an error.
#[async_trait]
pub trait SizeResolver: Send + Sync {
    /// Look up the size of `url`
    async fn head_size(&self, url: &str) -> SizeLookup;
}

#[async_trait]
impl SizeResolver for HttpClient {
    async fn head_size(&self, url: &str) -> SizeLookup {
        match self.head_content_length(url).await {
            Ok(Some(size)) => SizeLookup::found(size),
            Ok(None) => SizeLookup::missing(MISSING_LENGTH_REMARK),
            Err(e) => SizeLookup::failed(&e),
        }
    }
}

/// Resolver used when lookups are switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledResolver;

#[async_trait]
impl SizeResolver for DisabledResolver {
    async fn head_size(&self, _url: &str) -> SizeLookup {
        SizeLookup::skipped(DISABLED_REMARK)
    }
}

/// A size row waiting for its lookup
#[derive(Debug, Clone)]
pub struct SizeJob {
    /// Row to fill
    pub row: Row,
    /// URL of the file the row describes
    pub url: String,
}
