//! Output sinks
//!
//! A sink receives a header at most once and then whole batches of rows.

use crate::error::{Error, Result};
use crate::transform::Row;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only destination for one table
pub trait Sink: Send {
    /// Whether the destination holds no data yet
    fn is_empty(&self) -> Result<bool>;

    /// Write the header line; returns bytes written
    fn write_header(&mut self, columns: &[&str]) -> Result<u64>;

    /// Write a whole batch as one unit; returns bytes written
    fn write_rows(&mut self, rows: &[Row]) -> Result<u64>;

    /// Release the destination
    fn close(&mut self) -> Result<()>;

    /// Human-readable destination for logs
    fn describe(&self) -> String;
}

/// CSV file opened for append
///
/// Each batch is encoded in memory and handed to the file in a single write.
#[derive(Debug)]
pub struct CsvFileSink {
    path: PathBuf,
    file: Option<File>,
}

impl CsvFileSink {
    /// Open (or create) a CSV file for append, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::Sink {
                table: path.display().to_string(),
                message: format!("Failed to create directory: {e}"),
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::Sink {
                table: path.display().to_string(),
                message: format!("Failed to open file: {e}"),
            })?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        let path = &self.path;
        self.file
            .as_mut()
            .ok_or_else(|| Error::sink(path.display().to_string(), "sink already closed"))
    }

    fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let file = self.file()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(bytes.len() as u64)
    }
}

impl Sink for CsvFileSink {
    fn is_empty(&self) -> Result<bool> {
        match &self.file {
            Some(file) => Ok(file.metadata()?.len() == 0),
            None => Err(Error::sink(self.path.display().to_string(), "sink already closed")),
        }
    }

    fn write_header(&mut self, columns: &[&str]) -> Result<u64> {
        let bytes = encode(std::iter::once(columns))?;
        self.append(&bytes)
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<u64> {
        let bytes = encode(rows.iter().map(Row::values))?;
        self.append(&bytes)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Encode records with standard CSV quoting
fn encode<I, R, F>(records: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}
