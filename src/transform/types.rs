//! Transform types
//!
//! Output rows, table schemas and the transform trait.

use crate::reconstruct::Record;
use chrono::Local;

/// Fixed column layout of one output table
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name
    pub name: &'static str,
    /// Default output file name
    pub file_name: &'static str,
    /// Ordered column names, written as the header
    pub columns: &'static [&'static str],
}

impl TableSchema {
    /// Position of a column
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// One output row, values in schema column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    schema: &'static TableSchema,
    values: Vec<String>,
}

impl Row {
    /// Create a row; `values` must follow the schema's column order
    pub fn new(schema: &'static TableSchema, values: Vec<String>) -> Self {
        debug_assert_eq!(
            values.len(),
            schema.columns.len(),
            "row width does not match table '{}'",
            schema.name
        );
        Self { schema, values }
    }

    /// Table this row belongs to
    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    /// Value of a column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.schema
            .column_index(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Replace the value of a column; returns false for unknown columns
    pub fn set(&mut self, column: &str, value: impl Into<String>) -> bool {
        match self.schema.column_index(column) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// Values in column order
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Out-of-band work a table needs before its rows can be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    /// Rows are final as produced
    None,
    /// Rows carry one file each, in `in_network_files` order, and need the
    /// remote byte size of that file
    FileSize,
}

/// Run-wide values stamped onto rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformContext {
    /// Carrier label
    pub carrier: String,
    /// Batch label, e.g. `2024-10`
    pub batch: String,
    /// Identifier of the source document (path or URL)
    pub source_url: String,
    /// Base name of the source document
    pub source_file_name: String,
    /// Date the run parsed the document, `YYYY-MM-DD`
    pub parsed_date: String,
}

impl TransformContext {
    /// Create a context dated today
    pub fn new(
        carrier: impl Into<String>,
        batch: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        let source_url = source_url.into();
        let source_file_name = source_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit(['/', '\\']).next())
            .unwrap_or_default()
            .to_string();
        Self {
            carrier: carrier.into(),
            batch: batch.into(),
            source_file_name,
            source_url,
            parsed_date: Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    /// Override the parse date
    #[must_use]
    pub fn with_parsed_date(mut self, date: impl Into<String>) -> Self {
        self.parsed_date = date.into();
        self
    }
}

/// Record-to-rows mapping for one output table
pub trait Transform: Send + Sync {
    /// Output table layout
    fn schema(&self) -> &'static TableSchema;

    /// Rows for one record, in output order
    fn transform(&self, record: &Record, context: &TransformContext) -> Vec<Row>;

    /// Extra work rows need before they are written
    fn enrichment(&self) -> Enrichment {
        Enrichment::None
    }
}
