//! Enrichment sidecar
//!
//! Size rows are queued with their file URL on a bounded channel. A fixed
//! pool of workers shares the receiving end, looks each URL up once and sends
//! the filled row back on a results channel. The coordinator drains finished
//! rows as it goes and collects the rest on `close`.
//!
//! Rows leave the sidecar in completion order, not submission order.

use super::types::{SizeJob, SizeLookup, SizeResolver};
use crate::error::{Error, Result};
use crate::transform::{Row, REMARKS_COLUMN, SIZE_COLUMN};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidecarStats {
    /// Jobs accepted
    pub submitted: u64,
    /// Lookups that produced a size
    pub resolved: u64,
    /// Lookups that left the size empty
    pub failed: u64,
    /// Rows passed through without a lookup
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    resolved: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Worker pool for remote size lookups
pub struct SizeSidecar {
    jobs: Option<mpsc::Sender<SizeJob>>,
    results: mpsc::UnboundedReceiver<Row>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    submitted: u64,
}

impl SizeSidecar {
    /// Start `workers` lookup tasks on the current runtime
    ///
    /// `queue_capacity` bounds the jobs waiting for a worker; `submit` waits
    /// while the queue is full.
    pub fn spawn(
        resolver: Arc<dyn SizeResolver>,
        workers: usize,
        timeout: Duration,
        queue_capacity: usize,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel(queue_capacity.max(1));
        let (row_tx, row_rx) = mpsc::unbounded_channel();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let counters = Arc::new(Counters::default());

        let handles = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&resolver),
                    Arc::clone(&job_rx),
                    row_tx.clone(),
                    timeout,
                    Arc::clone(&counters),
                ))
            })
            .collect::<Vec<_>>();

        debug!(workers = handles.len(), queue_capacity, ?timeout, "Started size lookup workers");

        Self {
            jobs: Some(job_tx),
            results: row_rx,
            workers: handles,
            counters,
            submitted: 0,
        }
    }

    /// Queue a row for lookup
    pub async fn submit(&mut self, job: SizeJob) -> Result<()> {
        let jobs = self.jobs.as_ref().ok_or_else(|| Error::Enrichment {
            message: "sidecar already closed".to_string(),
        })?;
        jobs.send(job).await.map_err(|_| Error::Enrichment {
            message: "all lookup workers have stopped".to_string(),
        })?;
        self.submitted += 1;
        Ok(())
    }

    /// Rows whose lookup has finished, without waiting
    pub fn drain_ready(&mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Ok(row) = self.results.try_recv() {
            rows.push(row);
        }
        rows
    }

    /// Current counters
    pub fn stats(&self) -> SidecarStats {
        SidecarStats {
            submitted: self.submitted,
            resolved: self.counters.resolved.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting jobs, wait for every outstanding lookup and return the
    /// rows not yet drained
    ///
    /// Counters stay readable afterwards. Closing twice returns no rows.
    pub async fn close(&mut self) -> Result<Vec<Row>> {
        drop(self.jobs.take());

        let mut panicked = 0usize;
        for joined in join_all(self.workers.drain(..)).await {
            if let Err(e) = joined {
                error!("Size lookup worker failed: {e}");
                panicked += 1;
            }
        }

        let mut rows = Vec::new();
        while let Some(row) = self.results.recv().await {
            rows.push(row);
        }

        if panicked > 0 {
            return Err(Error::Enrichment {
                message: format!("{panicked} lookup workers terminated abnormally"),
            });
        }
        debug!(rows = rows.len(), "Size lookup workers finished");
        Ok(rows)
    }
}

impl std::fmt::Debug for SizeSidecar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeSidecar")
            .field("workers", &self.workers.len())
            .field("open", &self.jobs.is_some())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

async fn run_worker(
    id: usize,
    resolver: Arc<dyn SizeResolver>,
    jobs: Arc<Mutex<mpsc::Receiver<SizeJob>>>,
    results: mpsc::UnboundedSender<Row>,
    timeout: Duration,
    counters: Arc<Counters>,
) {
    loop {
        // Lock is held only while waiting for the next job
        let job = jobs.lock().await.recv().await;
        let Some(SizeJob { mut row, url }) = job else {
            break;
        };

        let lookup = match tokio::time::timeout(timeout, resolver.head_size(&url)).await {
            Ok(lookup) => lookup,
            #[allow(clippy::cast_possible_truncation)]
            Err(_) => SizeLookup::failed(&Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        if lookup.is_found() {
            counters.resolved.fetch_add(1, Ordering::Relaxed);
            debug!(worker = id, url = %url, size = ?lookup.size, "Size resolved");
        } else if lookup.skipped {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(worker = id, url = %url, remark = %lookup.remark, "Size lookup failed");
        }

        row.set(
            SIZE_COLUMN,
            lookup.size.map(|s| s.to_string()).unwrap_or_default(),
        );
        row.set(REMARKS_COLUMN, lookup.remark);

        if results.send(row).is_err() {
            break;
        }
    }
}
