//! Tests for the output module

use super::*;
use crate::error::{Error, Result};
use crate::transform::{Row, TableSchema};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use test_case::test_case;

static PAIR_SCHEMA: TableSchema = TableSchema {
    name: "pairs",
    file_name: "pairs.csv",
    columns: &["key", "value"],
};

fn row(key: &str, value: &str) -> Row {
    Row::new(&PAIR_SCHEMA, vec![key.to_string(), value.to_string()])
}

fn read_csv(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

/// In-memory sink recording each call
#[derive(Clone, Default)]
struct RecordingSink {
    headers: Arc<Mutex<u32>>,
    batches: Arc<Mutex<Vec<usize>>>,
    closed: Arc<Mutex<bool>>,
    prefilled: bool,
    fail_writes: bool,
}

impl Sink for RecordingSink {
    fn is_empty(&self) -> Result<bool> {
        Ok(!self.prefilled)
    }

    fn write_header(&mut self, columns: &[&str]) -> Result<u64> {
        *self.headers.lock().unwrap() += 1;
        Ok(columns.len() as u64)
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<u64> {
        if self.fail_writes {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.batches.lock().unwrap().push(rows.len());
        Ok(rows.len() as u64 * 10)
    }

    fn close(&mut self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// CSV Sink Tests
// ============================================================================

#[test]
fn test_csv_sink_writes_header_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pairs.csv");

    let sink = CsvFileSink::open(&path).unwrap();
    let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 10).unwrap();
    writer.append(row("a", "1")).unwrap();
    writer.append(row("b", "2")).unwrap();
    let stats = writer.close().unwrap();

    assert_eq!(
        read_csv(&path),
        vec![
            vec!["key".to_string(), "value".to_string()],
            vec!["a".to_string(), "1".to_string()],
            vec!["b".to_string(), "2".to_string()],
        ]
    );
    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.batches_flushed, 1);
    assert!(stats.header_written);
    assert_eq!(
        stats.bytes_written,
        std::fs::metadata(&path).unwrap().len()
    );
}

#[test]
fn test_csv_sink_appends_without_second_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pairs.csv");

    for (key, value) in [("a", "1"), ("b", "2")] {
        let sink = CsvFileSink::open(&path).unwrap();
        let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 10).unwrap();
        writer.append(row(key, value)).unwrap();
        writer.close().unwrap();
    }

    let records = read_csv(&path);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0], vec!["key", "value"]);
    assert_eq!(records[2], vec!["b", "2"]);
}

#[test]
fn test_csv_sink_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("out").join("pairs.csv");
    let sink = CsvFileSink::open(&path).unwrap();
    assert_eq!(sink.path(), path.as_path());
    assert!(path.exists());
}

#[test_case("plain", "plain" ; "plain value")]
#[test_case("a,b", "a,b" ; "comma")]
#[test_case("say \"hi\"", "say \"hi\"" ; "quotes")]
#[test_case("line1\nline2", "line1\nline2" ; "newline")]
#[test_case("", "" ; "empty")]
fn test_csv_quoting_preserves_values(value: &str, expected: &str) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pairs.csv");

    let sink = CsvFileSink::open(&path).unwrap();
    let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 1).unwrap();
    writer.append(row("k", value)).unwrap();
    writer.close().unwrap();

    let records = read_csv(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1][1], expected);
}

#[test]
fn test_csv_sink_rejects_writes_after_close() {
    let dir = TempDir::new().unwrap();
    let mut sink = CsvFileSink::open(dir.path().join("pairs.csv")).unwrap();
    sink.close().unwrap();
    assert!(sink.write_rows(&[row("a", "1")]).is_err());
    assert!(sink.is_empty().is_err());
}

// ============================================================================
// Batch Writer Tests
// ============================================================================

#[test]
fn test_batches_flush_at_threshold() {
    let sink = RecordingSink::default();
    let batches = sink.batches.clone();
    let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 3).unwrap();

    for i in 0..7 {
        writer.append(row(&i.to_string(), "v")).unwrap();
    }
    assert_eq!(*batches.lock().unwrap(), vec![3, 3]);
    assert_eq!(writer.stats().rows_written, 6);

    let stats = writer.close().unwrap();
    assert_eq!(*batches.lock().unwrap(), vec![3, 3, 1]);
    assert_eq!(stats.rows_written, 7);
    assert_eq!(stats.batches_flushed, 3);
}

#[test]
fn test_header_skipped_for_non_empty_sink() {
    let sink = RecordingSink {
        prefilled: true,
        ..RecordingSink::default()
    };
    let headers = sink.headers.clone();
    let writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 3).unwrap();
    let stats = writer.close().unwrap();

    assert_eq!(*headers.lock().unwrap(), 0);
    assert!(!stats.header_written);
    assert_eq!(stats.bytes_written, 0);
}

#[test]
fn test_close_without_rows_releases_sink() {
    let sink = RecordingSink::default();
    let closed = sink.closed.clone();
    let batches = sink.batches.clone();
    let writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 3).unwrap();
    writer.close().unwrap();

    assert!(*closed.lock().unwrap());
    assert!(batches.lock().unwrap().is_empty());
}

#[test]
fn test_flush_failure_is_sink_error_and_stops_writer() {
    let sink = RecordingSink {
        fail_writes: true,
        ..RecordingSink::default()
    };
    let closed = sink.closed.clone();
    let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 2).unwrap();

    writer.append(row("a", "1")).unwrap();
    let err = writer.append(row("b", "2")).unwrap_err();
    assert!(matches!(err, Error::Sink { ref table, .. } if table == "pairs"));
    assert_eq!(writer.stats().rows_written, 0);

    // Further rows are refused
    assert!(writer.append(row("c", "3")).is_err());

    // Close still releases the sink
    assert!(writer.close().is_ok());
    assert!(*closed.lock().unwrap());
}

#[test]
fn test_drop_flushes_pending_rows() {
    let sink = RecordingSink::default();
    let batches = sink.batches.clone();
    let closed = sink.closed.clone();
    {
        let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 10).unwrap();
        writer.append(row("a", "1")).unwrap();
        writer.append(row("b", "2")).unwrap();
    }
    assert_eq!(*batches.lock().unwrap(), vec![2]);
    assert!(*closed.lock().unwrap());
}

#[test]
fn test_zero_batch_size_flushes_every_row() {
    let sink = RecordingSink::default();
    let batches = sink.batches.clone();
    let mut writer = BatchWriter::open(&PAIR_SCHEMA, Box::new(sink), 0).unwrap();
    writer.append(row("a", "1")).unwrap();
    writer.append(row("b", "2")).unwrap();
    assert_eq!(*batches.lock().unwrap(), vec![1, 1]);
    assert_eq!(writer.stats().table, "pairs");
    assert_eq!(writer.stats().destination, "memory");
}
