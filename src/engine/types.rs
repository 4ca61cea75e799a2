//! Engine types

use crate::error::Error;
use crate::output::WriterStats;
use serde::Serialize;
use std::fmt;

/// Counters for one output table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    /// Table name
    pub table: String,
    /// Where the rows went
    pub file: String,
    /// Rows written
    pub rows_written: u64,
    /// Bytes written, header included
    pub bytes_written: u64,
    /// Batches flushed
    pub batches_flushed: u64,
}

impl From<WriterStats> for TableSummary {
    fn from(stats: WriterStats) -> Self {
        Self {
            table: stats.table,
            file: stats.destination,
            rows_written: stats.rows_written,
            bytes_written: stats.bytes_written,
            batches_flushed: stats.batches_flushed,
        }
    }
}

/// What a run processed, reported even when it failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Source document identifier
    pub source: String,
    /// Records completed
    pub records_processed: u64,
    /// Per-table counters, in table order
    pub tables: Vec<TableSummary>,
    /// Events skipped as malformed
    pub malformed_events: u64,
    /// Events that did not fit the record structure
    pub structural_violations: u64,
    /// Scalar fields at unrecognized paths
    pub unknown_fields: u64,
    /// Size lookups that produced a size
    pub lookups_resolved: u64,
    /// Size lookups that left the size empty
    pub lookups_failed: u64,
    /// Size rows written without a lookup
    pub lookups_skipped: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Fatal error, if the run stopped early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunSummary {
    /// Recoverable problems: malformed events, violations and failed lookups
    ///
    /// Skipped lookups are not problems.
    pub fn errors(&self) -> u64 {
        self.malformed_events + self.structural_violations + self.lookups_failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source:            {}", self.source)?;
        writeln!(f, "Records:           {}", self.records_processed)?;
        for table in &self.tables {
            writeln!(
                f,
                "  {:<18} {:>8} rows  {:>10} bytes  {}",
                table.table, table.rows_written, table.bytes_written, table.file
            )?;
        }
        writeln!(f, "Malformed events:  {}", self.malformed_events)?;
        writeln!(f, "Violations:        {}", self.structural_violations)?;
        writeln!(f, "Unknown fields:    {}", self.unknown_fields)?;
        writeln!(
            f,
            "Size lookups:      {} ok, {} failed, {} skipped",
            self.lookups_resolved, self.lookups_failed, self.lookups_skipped
        )?;
        write!(f, "Duration:          {}ms", self.duration_ms)?;
        if let Some(failure) = &self.failure {
            write!(f, "\nFailed:            {failure}")?;
        }
        Ok(())
    }
}

/// Result of a run: the summary plus the fatal error that stopped it, if any
#[derive(Debug)]
pub struct RunOutcome {
    /// Counters gathered up to the end of the run
    pub summary: RunSummary,
    /// First fatal error
    pub error: Option<Error>,
}

impl RunOutcome {
    /// Summary on success, error otherwise
    pub fn into_result(self) -> crate::error::Result<RunSummary> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }
}
