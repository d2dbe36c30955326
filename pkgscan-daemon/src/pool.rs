//! Fixed-size scan worker pool.
//!
//! `N` workers share one FIFO queue. Submitting never blocks: the request
//! service acknowledges immediately and the job waits for a free worker.
//!
//! # Shutdown
//!
//! [`WorkerPool::shutdown`] stops workers from taking new jobs, waits for
//! every in-flight scan to finish and then drops (and logs) whatever is
//! still queued.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pkgscan_container_runtime::RuntimeOps;
use pkgscan_core::ScanRequest;
use pkgscan_core::metrics as m;
use pkgscan_sbom::{
    RegistryResolver, SbomError, SbomGenerator, ScanOutcome, ScanPublisher,
};

/// Runs one accepted scan.
pub trait ScanJobHandler: Send + Sync + 'static {
    fn run(&self, request: ScanRequest) -> impl Future<Output = Result<ScanOutcome, SbomError>> + Send;
}

impl<R, P> ScanJobHandler for SbomGenerator<R, P>
where
    R: RuntimeOps,
    P: ScanPublisher + RegistryResolver,
{
    async fn run(&self, request: ScanRequest) -> Result<ScanOutcome, SbomError> {
        self.generate(&request).await
    }
}

/// A queued scan.
#[derive(Debug)]
struct Job {
    id: Uuid,
    request: ScanRequest,
    enqueued_at: Instant,
}

type JobQueue = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Cloneable submission side of the pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

impl PoolHandle {
    /// Enqueue a scan and return its job id.
    ///
    /// # Errors
    ///
    /// Fails once the pool has shut down.
    pub fn submit(&self, request: ScanRequest) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        let job = Job {
            id,
            request,
            enqueued_at: Instant::now(),
        };
        // Counted before the send so a worker never decrements first.
        let depth = self.depth.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if self.tx.send(job).is_err() {
            decrement_depth(&self.depth);
            return Err(anyhow::anyhow!("scan worker pool is shut down"));
        }
        metrics::gauge!(m::WORKER_QUEUE_DEPTH).set(depth as f64);
        Ok(id)
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Fixed-size worker pool.
pub struct WorkerPool {
    handle: PoolHandle,
    queue: JobQueue,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) sharing `handler`.
    pub fn start<H: ScanJobHandler>(size: usize, handler: Arc<H>) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let queue: JobQueue = Arc::new(Mutex::new(rx));
        let depth = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let workers = (0..size)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&handler),
                    Arc::clone(&queue),
                    Arc::clone(&depth),
                    cancel.clone(),
                ))
            })
            .collect();

        info!(workers = size, "scan worker pool started");
        Self {
            handle: PoolHandle { tx, depth },
            queue,
            cancel,
            workers,
        }
    }

    /// Submission handle for the request service.
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stop taking jobs, wait for running scans, drop the rest of the queue.
    ///
    /// Returns the number of queued jobs that were dropped.
    pub async fn shutdown(self) -> usize {
        self.cancel.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = %e, "scan worker panicked");
            }
        }

        let mut queue = self.queue.lock().await;
        queue.close();
        let mut dropped = 0;
        while let Ok(job) = queue.try_recv() {
            warn!(job_id = %job.id, source = %job.request.source, "dropping queued scan on shutdown");
            dropped += 1;
        }
        self.handle.depth.store(0, Ordering::SeqCst);
        metrics::gauge!(m::WORKER_QUEUE_DEPTH).set(0.0);
        info!(dropped, "scan worker pool stopped");
        dropped
    }
}

/// Saturating decrement; returns the new depth.
fn decrement_depth(depth: &AtomicUsize) -> usize {
    let previous = depth
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1)))
        .unwrap_or_else(|d| d);
    previous.saturating_sub(1)
}

async fn worker_loop<H: ScanJobHandler>(
    worker: usize,
    handler: Arc<H>,
    queue: JobQueue,
    depth: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        let remaining = decrement_depth(&depth);
        metrics::gauge!(m::WORKER_QUEUE_DEPTH).set(remaining as f64);
        debug!(
            worker,
            job_id = %job.id,
            waited_ms = job.enqueued_at.elapsed().as_millis() as u64,
            "scan picked up"
        );

        let scan_id = job.request.scan_id.clone();
        match handler.run(job.request).await {
            Ok(outcome) => match outcome.breach {
                Some(breach) => {
                    warn!(job_id = %job.id, scan_id = %scan_id, kind = %breach.kind, "{breach}");
                }
                None => debug!(job_id = %job.id, scan_id = %scan_id, "scan finished"),
            },
            Err(e) => {
                error!(job_id = %job.id, scan_id = %scan_id, kind = e.kind(), error = %e, "error in generating sbom");
            }
        }
    }
    debug!(worker, "scan worker stopped");
}
