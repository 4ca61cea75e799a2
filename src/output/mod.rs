//! Output module
//!
//! Handles batched row output to append-only sinks.
//!
//! # Overview
//!
//! This module provides:
//! - `Sink` - append-only destination for one table
//! - `CsvFileSink` - CSV file sink that appends across runs
//! - `BatchWriter` - header-once, bounded batching writer per table

mod sink;
mod writer;

pub use sink::{CsvFileSink, Sink};
pub use writer::{BatchWriter, WriterStats};

#[cfg(test)]
mod tests;
