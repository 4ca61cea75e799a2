//! Row transform module
//!
//! Maps each completed record to rows of one output table.
//!
//! # Overview
//!
//! - `Transform` - record to rows for one fixed `TableSchema`
//! - `TocMetadata`, `TocMrfMetadata`, `TocMrfSize` - the three tables
//! - `derive_file_name` / `classify_file` - shared naming rules

mod file_name;
mod transforms;
mod types;

pub use file_name::{classify_file, derive_file_name, UNKNOWN_FILE_NAME};
pub use transforms::{
    standard_transforms, TocMetadata, TocMrfMetadata, TocMrfSize, REMARKS_COLUMN, SIZE_COLUMN,
    TOC_METADATA_SCHEMA, TOC_MRF_METADATA_SCHEMA, TOC_MRF_SIZE_SCHEMA,
};
pub use types::{Enrichment, Row, TableSchema, Transform, TransformContext};
