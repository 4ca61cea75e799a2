//! Parse event module
//!
//! The linear event stream the pipeline consumes.
//!
//! # Overview
//!
//! - `ParseEvent` / `EventKind` - one (prefix, event, value) triple
//! - `EventSource` - forward-only cursor over events
//! - `JsonEventReader` - incremental JSON tokenizer over any `Read`
//! - `open_document` - opens a plain or gzipped index file

mod reader;
mod source;
mod types;

pub use reader::JsonEventReader;
pub use source::{open_document, DocumentReader};
pub use types::{EventKind, EventSource, ParseEvent, ReplaySource};
