//! Pipeline configuration
//!
//! Every field has a default, so an empty YAML file (or none at all) yields a
//! runnable configuration. Command-line flags are applied on top by the CLI.

use crate::error::{Error, Result};
use crate::transform::{TOC_METADATA_SCHEMA, TOC_MRF_METADATA_SCHEMA, TOC_MRF_SIZE_SCHEMA};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Pipeline Config
// ============================================================================

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Carrier label stamped on rows
    #[serde(default = "default_carrier")]
    pub carrier: String,

    /// Batch label, `YYYY-MM` by default
    #[serde(default = "default_batch")]
    pub batch: String,

    /// Identifier of the source document; the input path when unset
    #[serde(default)]
    pub source_url: Option<String>,

    /// Directory receiving the CSV tables
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Rows per flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Output file names
    #[serde(default)]
    pub tables: TablesConfig,

    /// Remote size lookups
    #[serde(default)]
    pub size_lookup: SizeLookupConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            carrier: default_carrier(),
            batch: default_batch(),
            source_url: None,
            output_dir: default_output_dir(),
            batch_size: default_batch_size(),
            tables: TablesConfig::default(),
            size_lookup: SizeLookupConfig::default(),
        }
    }
}

fn default_carrier() -> String {
    "anthem".to_string()
}

fn default_batch() -> String {
    Local::now().format("%Y-%m").to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_batch_size() -> usize {
    1000
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_value("batch_size", "must be at least 1"));
        }
        if self.carrier.trim().is_empty() {
            return Err(Error::invalid_value("carrier", "cannot be empty"));
        }
        self.tables.validate()?;
        self.size_lookup.validate()
    }

    /// Output path for a table
    pub fn table_path(&self, table: &str) -> Result<PathBuf> {
        let file = self
            .tables
            .file_for(table)
            .ok_or_else(|| Error::config(format!("No output file configured for table '{table}'")))?;
        Ok(self.output_dir.join(file))
    }
}

// ============================================================================
// Output Tables
// ============================================================================

/// File name per output table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablesConfig {
    /// File for the file listing table
    #[serde(default = "default_toc_metadata_file")]
    pub toc_metadata: String,

    /// File for the file x plan table
    #[serde(default = "default_toc_mrf_metadata_file")]
    pub toc_mrf_metadata: String,

    /// File for the file size table
    #[serde(default = "default_toc_mrf_size_file")]
    pub toc_mrf_size: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            toc_metadata: default_toc_metadata_file(),
            toc_mrf_metadata: default_toc_mrf_metadata_file(),
            toc_mrf_size: default_toc_mrf_size_file(),
        }
    }
}

fn default_toc_metadata_file() -> String {
    TOC_METADATA_SCHEMA.file_name.to_string()
}

fn default_toc_mrf_metadata_file() -> String {
    TOC_MRF_METADATA_SCHEMA.file_name.to_string()
}

fn default_toc_mrf_size_file() -> String {
    TOC_MRF_SIZE_SCHEMA.file_name.to_string()
}

impl TablesConfig {
    /// Configured file name for a table
    pub fn file_for(&self, table: &str) -> Option<&str> {
        match table {
            t if t == TOC_METADATA_SCHEMA.name => Some(&self.toc_metadata),
            t if t == TOC_MRF_METADATA_SCHEMA.name => Some(&self.toc_mrf_metadata),
            t if t == TOC_MRF_SIZE_SCHEMA.name => Some(&self.toc_mrf_size),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("tables.toc_metadata", &self.toc_metadata),
            ("tables.toc_mrf_metadata", &self.toc_mrf_metadata),
            ("tables.toc_mrf_size", &self.toc_mrf_size),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_value(field, "file name cannot be empty"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Size Lookups
// ============================================================================

/// Remote size lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLookupConfig {
    /// Whether to issue lookups at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Concurrent lookup workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-lookup timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Jobs allowed to wait for a worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Shared request rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// User agent for lookups and downloads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SizeLookupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            queue_capacity: default_queue_capacity(),
            requests_per_second: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    256
}

fn default_user_agent() -> String {
    format!("toc-ingest/{}", env!("CARGO_PKG_VERSION"))
}

impl SizeLookupConfig {
    /// Per-lookup timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_value("size_lookup.workers", "must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value(
                "size_lookup.timeout_secs",
                "must be at least 1",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(Error::invalid_value(
                "size_lookup.queue_capacity",
                "must be at least 1",
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "size_lookup.requests_per_second",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}
