// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # toc-ingest
//!
//! Streaming flattener for price-transparency "table of contents" index
//! files. Multi-gigabyte JSON documents are read as a stream of path-tagged
//! events, rebuilt one `reporting_structure` record at a time and written to
//! three CSV tables, so memory use never depends on document size.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toc_ingest::config::PipelineConfig;
//! use toc_ingest::engine::PipelineBuilder;
//! use toc_ingest::event::{open_document, JsonEventReader};
//! use toc_ingest::http::HttpClient;
//!
//! #[tokio::main]
//! async fn main() -> toc_ingest::Result<()> {
//!     let config = PipelineConfig::default();
//!     let pipeline = PipelineBuilder::from_config(&config, "index.json")?
//!         .resolver(Arc::new(HttpClient::new()?))
//!         .build()?;
//!
//!     let reader = JsonEventReader::new(open_document("index.json")?);
//!     let summary = pipeline.run(reader).await.into_result()?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ Event source │──▶│ Path matcher │──▶│ Reconstructor │── Record
//! └──────────────┘   └──────────────┘   └───────────────┘     │
//!                                                             ▼
//!            ┌───────────────────┬──────────────────┬──────────────────┐
//!            │ toc_metadata      │ toc_mrf_metadata │ toc_mrf_size     │
//!            │                   │                  │   ▼              │
//!            │                   │                  │ size sidecar     │
//!            ├───────────────────┼──────────────────┼──────────────────┤
//!            │ batch writer      │ batch writer     │ batch writer     │
//!            └───────────────────┴──────────────────┴──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types
pub mod types;

/// Pipeline configuration
pub mod config;

/// Streaming JSON events
pub mod event;

/// Path matching and record reconstruction
pub mod reconstruct;

/// Record to row transforms
pub mod transform;

/// CSV sinks and batch writers
pub mod output;

/// HTTP client with throttling
pub mod http;

/// Remote file size enrichment
pub mod enrich;

/// Pipeline coordinator
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::PipelineConfig;
pub use engine::{Pipeline, PipelineBuilder, RunOutcome, RunSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
