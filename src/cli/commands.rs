//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flatten price-transparency table-of-contents files into CSV tables
#[derive(Parser, Debug)]
#[command(name = "toc-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for summaries
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a local ToC file (.json or .json.gz)
    Process {
        /// Input document
        input: PathBuf,

        #[command(flatten)]
        overrides: ProcessArgs,
    },

    /// Download a ToC file, optionally processing it
    Fetch {
        /// URL of the ToC file
        url: String,

        /// Directory receiving the download
        #[arg(long, default_value = "downloads")]
        dest_dir: PathBuf,

        /// Process the file once downloaded
        #[arg(long)]
        process: bool,

        #[command(flatten)]
        overrides: ProcessArgs,
    },

    /// List output tables and their columns
    Tables,
}

/// Flags overriding the configuration file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProcessArgs {
    /// Directory receiving the CSV tables
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Carrier label
    #[arg(long)]
    pub carrier: Option<String>,

    /// Batch label (default: current YYYY-MM)
    #[arg(long)]
    pub batch: Option<String>,

    /// Source identifier stamped on rows (default: the input path or URL)
    #[arg(long)]
    pub source_url: Option<String>,

    /// Rows per flush
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Concurrent size lookups
    #[arg(long)]
    pub workers: Option<usize>,

    /// Timeout per size lookup, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Skip remote size lookups
    #[arg(long)]
    pub no_size_lookup: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
