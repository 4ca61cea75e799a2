//! Batch writer
//!
//! Buffers rows for one table and hands them to the sink in bounded batches.

use super::sink::Sink;
use crate::error::{Error, Result};
use crate::transform::{Row, TableSchema};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Counters for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    /// Table name
    pub table: String,
    /// Sink destination
    pub destination: String,
    /// Rows handed to the sink
    pub rows_written: u64,
    /// Bytes handed to the sink, header included
    pub bytes_written: u64,
    /// Batches flushed
    pub batches_flushed: u64,
    /// Whether this run wrote the header
    pub header_written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Failed,
    Closed,
}

/// Batching writer for one output table
///
/// The header goes out only when the sink is empty at open time, so an
/// existing file is extended without a second header. Rows still buffered
/// when the writer is dropped without `close` are flushed on a best-effort
/// basis.
pub struct BatchWriter {
    schema: &'static TableSchema,
    sink: Box<dyn Sink>,
    batch: Vec<Row>,
    batch_size: usize,
    stats: WriterStats,
    state: WriterState,
}

impl BatchWriter {
    /// Open a writer over a sink
    pub fn open(
        schema: &'static TableSchema,
        mut sink: Box<dyn Sink>,
        batch_size: usize,
    ) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let mut stats = WriterStats {
            table: schema.name.to_string(),
            destination: sink.describe(),
            ..WriterStats::default()
        };

        let empty = sink
            .is_empty()
            .map_err(|e| Error::sink(schema.name, format!("Failed to inspect sink: {e}")))?;
        if empty {
            stats.bytes_written += sink
                .write_header(schema.columns)
                .map_err(|e| Error::sink(schema.name, format!("Failed to write header: {e}")))?;
            stats.header_written = true;
        }

        debug!(
            table = schema.name,
            destination = %stats.destination,
            header = stats.header_written,
            batch_size,
            "Opened batch writer"
        );

        Ok(Self {
            schema,
            sink,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            stats,
            state: WriterState::Open,
        })
    }

    /// Table this writer serves
    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    /// Counters so far
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Buffer a row, flushing when the batch is full
    pub fn append(&mut self, row: Row) -> Result<()> {
        if self.state != WriterState::Open {
            return Err(Error::sink(
                self.schema.name,
                "writer is no longer accepting rows",
            ));
        }
        debug_assert_eq!(row.schema().name, self.schema.name);

        self.batch.push(row);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the buffered batch as one unit
    ///
    /// On failure the batch is discarded and the writer stops accepting rows.
    pub fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        if self.state != WriterState::Open {
            return Err(Error::sink(self.schema.name, "writer is not open"));
        }

        match self.sink.write_rows(&self.batch) {
            Ok(bytes) => {
                self.stats.rows_written += self.batch.len() as u64;
                self.stats.bytes_written += bytes;
                self.stats.batches_flushed += 1;
                debug!(
                    table = self.schema.name,
                    rows = self.batch.len(),
                    bytes,
                    "Flushed batch"
                );
                self.batch.clear();
                Ok(())
            }
            Err(e) => {
                let lost = self.batch.len();
                self.batch.clear();
                self.state = WriterState::Failed;
                error!(
                    table = self.schema.name,
                    rows = lost,
                    "Batch flush failed: {e}"
                );
                Err(Error::sink(
                    self.schema.name,
                    format!("Failed to flush {lost} rows: {e}"),
                ))
            }
        }
    }

    /// Flush what is left and release the sink
    pub fn close(mut self) -> Result<WriterStats> {
        let flushed = match self.state {
            WriterState::Open => self.flush(),
            _ => Ok(()),
        };
        self.state = WriterState::Closed;
        let released = self
            .sink
            .close()
            .map_err(|e| Error::sink(self.schema.name, format!("Failed to close sink: {e}")));

        flushed?;
        released?;
        Ok(self.stats.clone())
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        if self.state == WriterState::Closed {
            return;
        }
        if self.state == WriterState::Open && !self.batch.is_empty() {
            warn!(
                table = self.schema.name,
                rows = self.batch.len(),
                "Writer dropped without close; flushing pending rows"
            );
            if let Err(e) = self.flush() {
                warn!(table = self.schema.name, "Flush on drop failed: {e}");
            }
        }
        if let Err(e) = self.sink.close() {
            warn!(table = self.schema.name, "Closing sink on drop failed: {e}");
        }
    }
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("table", &self.schema.name)
            .field("pending", &self.batch.len())
            .field("batch_size", &self.batch_size)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
