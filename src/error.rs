//! Error types for toc-ingest
//!
//! This module defines the error hierarchy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall in two classes. Recoverable errors (`MalformedEvent`,
//! `StructuralViolation`) describe one bad event and are skipped and counted
//! by the coordinator. Everything else is fatal to the run.

use thiserror::Error;

/// The main error type for toc-ingest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Event Source Errors
    // ============================================================================
    #[error("Malformed event at '{path}': {message}")]
    MalformedEvent { path: String, message: String },

    #[error("Unreadable document at byte {offset}: {message}")]
    Decode { offset: u64, message: String },

    #[error("Structural violation: {message}")]
    StructuralViolation { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Sink failure for table '{table}': {message}")]
    Sink { table: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Enrichment pool stopped: {message}")]
    Enrichment { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a malformed event error
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(offset: u64, message: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            message: message.into(),
        }
    }

    /// Create a structural violation
    pub fn violation(message: impl Into<String>) -> Self {
        Self::StructuralViolation {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether the run can skip this error and keep consuming events
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedEvent { .. } | Error::StructuralViolation { .. }
        )
    }
}

/// Result type alias for toc-ingest
pub type Result<T> = std::result::Result<T, Error>;
