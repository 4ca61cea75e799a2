//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, ProcessArgs};
use crate::config::PipelineConfig;
use crate::engine::{PipelineBuilder, RunSummary};
use crate::enrich::{DisabledResolver, SizeResolver};
use crate::error::Result;
use crate::event::{open_document, JsonEventReader};
use crate::http::{HttpClient, HttpClientConfig};
use crate::transform::standard_transforms;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Process { input, overrides } => {
                self.process(input, overrides, None).await.map(|_| ())
            }
            Commands::Fetch {
                url,
                dest_dir,
                process,
                overrides,
            } => self.fetch(url, dest_dir, *process, overrides).await,
            Commands::Tables => {
                self.tables();
                Ok(())
            }
        }
    }

    /// Configuration file (or defaults) with command-line overrides applied
    pub fn load_config(&self, overrides: &ProcessArgs) -> Result<PipelineConfig> {
        let mut config = match &self.cli.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        apply_overrides(&mut config, overrides);
        config.validate()?;
        Ok(config)
    }

    /// Process one local document
    async fn process(
        &self,
        input: &Path,
        overrides: &ProcessArgs,
        fetched_from: Option<&str>,
    ) -> Result<RunSummary> {
        let config = self.load_config(overrides)?;
        // Without a configured source URL, a fetched document is named by its URL
        let fallback = fetched_from.map_or_else(|| input.display().to_string(), str::to_string);

        let document = open_document(input)?;
        let pipeline = PipelineBuilder::from_config(&config, fallback)?
            .resolver(size_resolver(&config)?)
            .build()?;

        info!(
            input = %input.display(),
            source = %pipeline.context().source_url,
            output_dir = %config.output_dir.display(),
            carrier = %config.carrier,
            batch = %config.batch,
            "Processing document"
        );

        let outcome = pipeline.run(JsonEventReader::new(document)).await;
        self.output_summary(&outcome.summary);
        outcome.into_result()
    }

    /// Download a document, then optionally process it
    async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        process: bool,
        overrides: &ProcessArgs,
    ) -> Result<()> {
        let config = self.load_config(overrides)?;
        let client = HttpClient::with_config(http_config(&config))?;
        let (path, bytes) = client.download(url, dest_dir).await?;

        self.output_message(&json!({
            "type": "DOWNLOAD",
            "url": url,
            "path": path.display().to_string(),
            "bytes": bytes
        }));

        if process {
            self.process(&path, overrides, Some(url)).await?;
        }
        Ok(())
    }

    /// Print table layouts
    fn tables(&self) {
        let tables: Vec<Value> = standard_transforms()
            .iter()
            .map(|t| {
                let schema = t.schema();
                json!({
                    "name": schema.name,
                    "file": schema.file_name,
                    "columns": schema.columns
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "TABLES",
            "tables": tables
        }));
    }

    fn output_summary(&self, summary: &RunSummary) {
        match self.cli.format {
            OutputFormat::Json => self.output_message(&json!({
                "type": "SUMMARY",
                "summary": summary
            })),
            OutputFormat::Pretty => println!("{summary}"),
        }
    }

    /// Output a JSON message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Apply command-line flags on top of file values
pub fn apply_overrides(config: &mut PipelineConfig, args: &ProcessArgs) {
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(carrier) = &args.carrier {
        config.carrier.clone_from(carrier);
    }
    if let Some(batch) = &args.batch {
        config.batch.clone_from(batch);
    }
    if let Some(source) = &args.source_url {
        config.source_url = Some(source.clone());
    }
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(workers) = args.workers {
        config.size_lookup.workers = workers;
    }
    if let Some(timeout) = args.timeout_secs {
        config.size_lookup.timeout_secs = timeout;
    }
    if args.no_size_lookup {
        config.size_lookup.enabled = false;
    }
}

fn http_config(config: &PipelineConfig) -> HttpClientConfig {
    let lookup = &config.size_lookup;
    let http = HttpClientConfig::default()
        .timeout(lookup.timeout())
        .user_agent(&lookup.user_agent);
    match lookup.requests_per_second {
        Some(rate) => http.requests_per_second(rate),
        None => http,
    }
}

fn size_resolver(config: &PipelineConfig) -> Result<Arc<dyn SizeResolver>> {
    if config.size_lookup.enabled {
        Ok(Arc::new(HttpClient::with_config(http_config(config))?))
    } else {
        Ok(Arc::new(DisabledResolver))
    }
}
