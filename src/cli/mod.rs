//! CLI module
//!
//! Command-line interface for the pipeline.
//!
//! # Commands
//!
//! - `process` - Flatten a local ToC file into CSV tables
//! - `fetch` - Download a ToC file, optionally processing it
//! - `tables` - List output tables and columns

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, ProcessArgs};
pub use runner::Runner;
