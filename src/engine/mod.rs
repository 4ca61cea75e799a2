//! Pipeline coordinator
//!
//! Drives the event source through the path matcher and reconstructor, fans
//! every completed record out to the table transforms and routes size rows
//! through the enrichment sidecar.
//!
//! # Overview
//!
//! - `PipelineBuilder` - collects tables and lookup settings, opens writers
//! - `Pipeline::run` - consumes one document and closes everything it opened
//! - `RunSummary` - counters reported even when the run fails

mod types;

pub use types::{RunOutcome, RunSummary, TableSummary};

use crate::config::PipelineConfig;
use crate::enrich::{SizeJob, SizeResolver, SizeSidecar};
use crate::error::{Error, Result};
use crate::event::{EventSource, ParseEvent};
use crate::output::{BatchWriter, CsvFileSink, Sink};
use crate::reconstruct::{ObjectReconstructor, PathMatcher, Record};
use crate::transform::{standard_transforms, Enrichment, Row, Transform, TransformContext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events handed from the reader thread in one message
const EVENT_CHUNK: usize = 512;

/// Chunks the reader may run ahead of the coordinator
const EVENT_CHUNKS_IN_FLIGHT: usize = 16;

type EventChunk = Vec<Result<ParseEvent>>;

/// One output table: its transform and its writer
struct TableLane {
    transform: Box<dyn Transform>,
    writer: BatchWriter,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for a pipeline
pub struct PipelineBuilder {
    context: TransformContext,
    batch_size: usize,
    tables: Vec<(Box<dyn Transform>, Box<dyn Sink>)>,
    resolver: Option<Arc<dyn SizeResolver>>,
    lookup_workers: usize,
    lookup_timeout: Duration,
    queue_capacity: usize,
}

impl PipelineBuilder {
    /// Start a pipeline stamping rows with `context`
    pub fn new(context: TransformContext) -> Self {
        Self {
            context,
            batch_size: 1000,
            tables: Vec::new(),
            resolver: None,
            lookup_workers: 8,
            lookup_timeout: Duration::from_secs(30),
            queue_capacity: 256,
        }
    }

    /// Builder preloaded from configuration with the three standard CSV tables
    ///
    /// Rows name `config.source_url` as their source, or `input` when it is
    /// unset.
    pub fn from_config(config: &PipelineConfig, input: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let source = config.source_url.clone().unwrap_or_else(|| input.into());
        let context = TransformContext::new(&config.carrier, &config.batch, source);
        let mut builder = Pipeline::builder(context)
            .batch_size(config.batch_size)
            .lookup_workers(config.size_lookup.workers)
            .lookup_timeout(config.size_lookup.timeout())
            .queue_capacity(config.size_lookup.queue_capacity);

        for transform in standard_transforms() {
            let path = config.table_path(transform.schema().name)?;
            let sink = CsvFileSink::open(&path)?;
            builder = builder.table(transform, Box::new(sink));
        }
        Ok(builder)
    }

    /// Rows per flush
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Add an output table
    #[must_use]
    pub fn table(mut self, transform: Box<dyn Transform>, sink: Box<dyn Sink>) -> Self {
        self.tables.push((transform, sink));
        self
    }

    /// Resolver for tables that need file sizes
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn SizeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Concurrent size lookups
    #[must_use]
    pub fn lookup_workers(mut self, workers: usize) -> Self {
        self.lookup_workers = workers;
        self
    }

    /// Timeout for one size lookup
    #[must_use]
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Size jobs allowed to wait for a worker
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Open a writer per table
    pub fn build(self) -> Result<Pipeline> {
        if self.tables.is_empty() {
            return Err(Error::config("pipeline has no output tables"));
        }
        let needs_sizes = self
            .tables
            .iter()
            .any(|(t, _)| t.enrichment() == Enrichment::FileSize);
        if needs_sizes && self.resolver.is_none() {
            return Err(Error::config(
                "a table needs file sizes but no size resolver was configured",
            ));
        }

        let mut lanes = Vec::with_capacity(self.tables.len());
        for (transform, sink) in self.tables {
            let schema = transform.schema();
            if lanes
                .iter()
                .any(|lane: &TableLane| lane.writer.schema().name == schema.name)
            {
                return Err(Error::config(format!("table '{}' added twice", schema.name)));
            }
            let writer = BatchWriter::open(schema, sink, self.batch_size)?;
            lanes.push(TableLane { transform, writer });
        }

        Ok(Pipeline {
            context: self.context,
            lanes,
            matcher: PathMatcher::new(),
            reconstructor: ObjectReconstructor::new(),
            resolver: self.resolver.filter(|_| needs_sizes),
            lookup_workers: self.lookup_workers,
            lookup_timeout: self.lookup_timeout,
            queue_capacity: self.queue_capacity,
            sidecar: None,
            malformed_events: 0,
        })
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Single-document pipeline
///
/// Event consumption, reconstruction and fan-out are sequential; only size
/// lookups run concurrently. Rows of tables without enrichment keep document
/// order. Size rows are written in lookup completion order.
pub struct Pipeline {
    context: TransformContext,
    lanes: Vec<TableLane>,
    matcher: PathMatcher,
    reconstructor: ObjectReconstructor,
    resolver: Option<Arc<dyn SizeResolver>>,
    lookup_workers: usize,
    lookup_timeout: Duration,
    queue_capacity: usize,
    sidecar: Option<SizeSidecar>,
    malformed_events: u64,
}

impl Pipeline {
    /// Start building a pipeline
    pub fn builder(context: TransformContext) -> PipelineBuilder {
        PipelineBuilder::new(context)
    }

    /// Values stamped on every row
    pub fn context(&self) -> &TransformContext {
        &self.context
    }

    /// Consume `source` to the end, then close the sidecar and every writer
    ///
    /// The source is read on a blocking thread and handed over in bounded
    /// chunks, so document I/O never stalls the runtime. Writers are closed
    /// even after a fatal error, so rows already batched reach their sinks
    /// and the summary covers what was written.
    pub async fn run<E>(mut self, source: E) -> RunOutcome
    where
        E: EventSource + Send + 'static,
    {
        let start = Instant::now();
        info!(
            source = %self.context.source_url,
            tables = self.lanes.len(),
            "Starting pipeline"
        );

        if let Some(resolver) = self.resolver.take() {
            self.sidecar = Some(SizeSidecar::spawn(
                resolver,
                self.lookup_workers,
                self.lookup_timeout,
                self.queue_capacity,
            ));
        }

        let (tx, mut rx) = mpsc::channel(EVENT_CHUNKS_IN_FLIGHT);
        let reader = tokio::task::spawn_blocking(move || read_events(source, &tx));

        let mut fatal = self.consume(&mut rx).await.err();
        // Unblocks the reader if the coordinator stopped first
        drop(rx);
        if let Err(e) = reader.await {
            fatal.get_or_insert(Error::Io(std::io::Error::other(format!(
                "event reader stopped abnormally: {e}"
            ))));
        }
        if let Some(e) = &fatal {
            error!("Pipeline stopped: {e}");
        }
        if let Err(e) = self.reconstructor.finish() {
            warn!("{e}");
        }

        let (mut summary, close_error) = self.finalize().await;
        let error = fatal.or(close_error);
        summary.duration_ms = start.elapsed().as_millis() as u64;
        summary.failure = error.as_ref().map(ToString::to_string);

        info!(
            records = summary.records_processed,
            errors = summary.errors(),
            duration_ms = summary.duration_ms,
            "Pipeline finished"
        );
        RunOutcome { summary, error }
    }

    async fn consume(&mut self, events: &mut mpsc::Receiver<EventChunk>) -> Result<()> {
        while let Some(chunk) = events.recv().await {
            for item in chunk {
                let event = match item {
                    Ok(event) => event,
                    Err(e) if e.is_recoverable() => {
                        self.malformed_events += 1;
                        warn!("Skipping event: {e}");
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let tag = self.matcher.classify(&event.path, event.kind);
                match self.reconstructor.apply(tag, event) {
                    Ok(Some(record)) => self.dispatch(&record).await?,
                    Ok(None) => {}
                    Err(e) if e.is_recoverable() => warn!("{e}"),
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Run every transform over a completed record
    async fn dispatch(&mut self, record: &Record) -> Result<()> {
        for lane in &mut self.lanes {
            let rows = lane.transform.transform(record, &self.context);
            match lane.transform.enrichment() {
                Enrichment::None => {
                    for row in rows {
                        lane.writer.append(row)?;
                    }
                }
                Enrichment::FileSize => {
                    let sidecar = self.sidecar.as_mut().ok_or_else(|| Error::Enrichment {
                        message: "size lookups are not running".to_string(),
                    })?;
                    for (row, file) in rows.into_iter().zip(&record.in_network_files) {
                        sidecar
                            .submit(SizeJob {
                                row,
                                url: file.location.clone(),
                            })
                            .await?;
                    }
                }
            }
        }

        let ready = match self.sidecar.as_mut() {
            Some(sidecar) => sidecar.drain_ready(),
            None => Vec::new(),
        };
        for row in ready {
            self.append_enriched(row)?;
        }
        Ok(())
    }

    fn append_enriched(&mut self, row: Row) -> Result<()> {
        let table = row.schema().name;
        let lane = self
            .lanes
            .iter_mut()
            .find(|lane| lane.writer.schema().name == table)
            .ok_or_else(|| Error::sink(table, "no writer for enriched row"))?;
        lane.writer.append(row)
    }

    /// Close the sidecar, then every writer; returns the first failure
    async fn finalize(&mut self) -> (RunSummary, Option<Error>) {
        let mut first_error: Option<Error> = None;
        let mut summary = RunSummary {
            source: self.context.source_url.clone(),
            ..RunSummary::default()
        };

        if let Some(mut sidecar) = self.sidecar.take() {
            match sidecar.close().await {
                Ok(rows) => {
                    debug!(rows = rows.len(), "Collected remaining size rows");
                    for row in rows {
                        if let Err(e) = self.append_enriched(row) {
                            first_error.get_or_insert(e);
                        }
                    }
                }
                Err(e) => {
                    error!("Size lookups did not shut down cleanly: {e}");
                    first_error.get_or_insert(e);
                }
            }
            let stats = sidecar.stats();
            summary.lookups_resolved = stats.resolved;
            summary.lookups_failed = stats.failed;
            summary.lookups_skipped = stats.skipped;
        }

        for lane in self.lanes.drain(..) {
            let snapshot = lane.writer.stats().clone();
            match lane.writer.close() {
                Ok(stats) => summary.tables.push(stats.into()),
                Err(e) => {
                    error!(table = %snapshot.table, "Failed to close writer: {e}");
                    summary.tables.push(snapshot.into());
                    first_error.get_or_insert(e);
                }
            }
        }

        let stats = self.reconstructor.stats();
        summary.records_processed = stats.records_completed;
        summary.structural_violations = stats.structural_violations;
        summary.unknown_fields = stats.unknown_fields;
        summary.malformed_events = self.malformed_events;

        (summary, first_error)
    }
}

/// Pull events until the end of the stream or a fatal error, sending them
/// in chunks; stops early when the receiver is gone
fn read_events<E: EventSource>(mut source: E, events: &mpsc::Sender<EventChunk>) {
    let mut chunk = Vec::with_capacity(EVENT_CHUNK);
    loop {
        let (item, last) = match source.next_event() {
            Ok(Some(event)) => (Ok(event), false),
            Ok(None) => break,
            Err(e) => {
                let last = !e.is_recoverable();
                (Err(e), last)
            }
        };
        chunk.push(item);
        if last {
            break;
        }
        if chunk.len() == EVENT_CHUNK {
            let full = std::mem::replace(&mut chunk, Vec::with_capacity(EVENT_CHUNK));
            if events.blocking_send(full).is_err() {
                return;
            }
        }
    }
    if !chunk.is_empty() {
        let _ = events.blocking_send(chunk);
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("context", &self.context)
            .field("tables", &self.lanes.len())
            .field("sidecar", &self.sidecar)
            .finish_non_exhaustive()
    }
}
