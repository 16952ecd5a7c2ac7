//! Shared application state and the background extraction pipeline.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use pdfintake::worker::{
    DirectoryScanner, ExtractionHandler, JobResult, RetryPolicy, StoreProgress, WorkerPool,
};
use pdfintake::{Config, Database, IntakeError, IntakeService, RecordStore};

const RESULT_POLL: Duration = Duration::from_millis(100);

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: IntakeService,
}

impl AppState {
    pub fn new(service: IntakeService) -> Self {
        Self { service }
    }
}

/// Opens the configured database, or an in-memory one when no path can be
/// determined.
pub fn open_store(config: &Config) -> Result<RecordStore, IntakeError> {
    let db = match config.database_path() {
        Some(path) => {
            info!("Using database at {}", path.display());
            Database::open(&path)?
        }
        None => {
            warn!("No database path available, falling back to an in-memory database");
            Database::open_in_memory()?
        }
    };
    Ok(RecordStore::new(db))
}

/// Creates the pool that runs extraction jobs against `store`.
pub fn start_pool(config: &Config, store: &RecordStore) -> WorkerPool {
    WorkerPool::new(
        Arc::new(ExtractionHandler::new(store.clone())),
        Arc::new(StoreProgress::new(store.clone())),
        config.worker_count,
        RetryPolicy::from(config.retry),
    )
}

pub fn log_result(result: &JobResult) {
    if result.success {
        info!(
            "Job {} completed: {} (attempts: {}, degraded: {})",
            result.job_id, result.filename, result.attempts, result.degraded
        );
    } else {
        warn!(
            "Job {} failed: {} - {:?}",
            result.job_id, result.filename, result.error
        );
    }
}

/// Worker pool plus the threads feeding and draining it while the server runs.
pub struct Pipeline {
    pool: Arc<WorkerPool>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Starts the pool, submits the PDFs already in the watch folder and
    /// begins watching it for new ones.
    pub fn start(config: &Config, store: &RecordStore) -> Result<Self, IntakeError> {
        let stale = store.fail_unfinished_jobs()?;
        if stale > 0 {
            warn!("Marked {} unfinished jobs from a previous run as failed", stale);
        }

        let pool = Arc::new(start_pool(config, store));
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut threads = Vec::with_capacity(2);

        // Results must be drained or workers block on the bounded channel
        let results = pool.results();
        let shutdown_for_results = Arc::clone(&shutdown);
        threads.push(thread::spawn(move || {
            while !shutdown_for_results.load(Ordering::Relaxed) {
                if let Ok(result) = results.recv_timeout(RESULT_POLL) {
                    log_result(&result);
                }
            }
            debug!("Result consumer stopped");
        }));

        let scanner = DirectoryScanner::new(config.watch_directory());
        let pool_for_scanner = Arc::clone(&pool);
        let shutdown_for_scanner = Arc::clone(&shutdown);
        threads.push(thread::spawn(move || {
            run_scanner(scanner, pool_for_scanner, shutdown_for_scanner);
        }));

        Ok(Self {
            pool,
            shutdown,
            threads,
        })
    }

    pub fn pool(&self) -> Arc<WorkerPool> {
        Arc::clone(&self.pool)
    }

    /// Stops the watcher and result consumer, then the workers.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.pool.shutdown();

        for handle in self.threads {
            if handle.join().is_err() {
                error!("Pipeline thread panicked");
            }
        }

        match Arc::try_unwrap(self.pool) {
            Ok(pool) => pool.wait(),
            Err(_) => warn!("Worker pool still referenced, not waiting for workers"),
        }
    }
}

fn submit_path(pool: &WorkerPool, path: PathBuf) {
    debug!("Submitting job for {}", path.display());
    if let Err(e) = pool.submit_path(path) {
        error!("Failed to submit job: {}", e);
    }
}

fn run_scanner(scanner: DirectoryScanner, pool: Arc<WorkerPool>, shutdown: Arc<AtomicBool>) {
    info!("Performing initial scan of {}", scanner.watch_directory().display());
    match scanner.scan() {
        Ok(jobs) => {
            info!("Initial scan found {} PDFs", jobs.len());
            for job in jobs {
                if shutdown.load(Ordering::Relaxed) {
                    return;
                }
                if let Err(e) = pool.submit(job) {
                    error!("Failed to submit job: {}", e);
                }
            }
        }
        Err(e) => error!("Initial scan failed: {}", e),
    }

    let pool_for_watch = Arc::clone(&pool);
    if let Err(e) = scanner.watch(move |path| submit_path(&pool_for_watch, path), shutdown) {
        error!("Folder watcher stopped: {}", e);
    }
}
