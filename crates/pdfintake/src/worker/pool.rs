use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};
use tracing::info_span;

use crate::config::RetryConfig;
use crate::error::WorkerError;
use crate::sanitize;
use crate::worker::job::{Job, JobHandle, JobResult};
use crate::worker::progress::{ProgressEvent, ProgressReporter};
use crate::worker::runner::JobHandler;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fixed-backoff retry policy applied to retryable job failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

/// Shared by every worker thread.
struct WorkerContext {
    handler: Arc<dyn JobHandler>,
    progress: Arc<dyn ProgressReporter>,
    retry: RetryPolicy,
    job_sender: Sender<Job>,
    result_sender: Sender<JobResult>,
    shutdown: Arc<AtomicBool>,
}

pub struct WorkerPool {
    job_sender: Sender<Job>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    progress: Arc<dyn ProgressReporter>,
    retry: RetryPolicy,
}

impl WorkerPool {
    /// Starts `worker_count` threads (at least one) pulling jobs from a
    /// bounded queue.
    pub fn new(
        handler: Arc<dyn JobHandler>,
        progress: Arc<dyn ProgressReporter>,
        worker_count: usize,
        retry: RetryPolicy,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (job_sender, job_receiver) = bounded::<Job>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<JobResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let context = Arc::new(WorkerContext {
            handler,
            progress: Arc::clone(&progress),
            retry,
            job_sender: job_sender.clone(),
            result_sender,
            shutdown: Arc::clone(&shutdown),
        });

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let worker_context = Arc::clone(&context);

            let handle = thread::spawn(move || {
                run_worker(worker_id, job_rx, worker_context);
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
            progress,
            retry,
        }
    }

    /// Enqueues a job. The job is recorded as `queued` before this returns,
    /// so its handle can be polled right away. Blocks while the queue is full.
    pub fn submit(&self, job: Job) -> Result<JobHandle, WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        let handle = JobHandle::from(&job);
        self.progress.report(
            &job,
            ProgressEvent::Queued {
                max_retries: self.retry.max_retries,
            },
        );

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)?;
        Ok(handle)
    }

    pub fn submit_path(&self, path: PathBuf) -> Result<JobHandle, WorkerError> {
        self.submit(Job::from_path(path))
    }

    pub fn submit_bytes(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<JobHandle, WorkerError> {
        self.submit(Job::from_bytes(bytes, filename))
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<JobResult> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    /// A receiver for terminal results, for draining on another thread.
    pub fn results(&self) -> Receiver<JobResult> {
        self.result_receiver.clone()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stops the workers and joins them. Jobs still queued or waiting for a
    /// retry are abandoned.
    pub fn wait(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(worker_id: usize, job_receiver: Receiver<Job>, context: Arc<WorkerContext>) {
    debug!("Worker {} started", worker_id);

    loop {
        if context.shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(job) => {
                debug!("Worker {} processing job {}", worker_id, job.id);

                if let Some(result) = process_job(job, &context) {
                    if let Err(e) = context.result_sender.send(result) {
                        error!("Worker {} failed to send result: {}", worker_id, e);
                        break;
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Runs one attempt. Returns the terminal result, or `None` when the job was
/// handed to the retry timer.
fn process_job(job: Job, context: &WorkerContext) -> Option<JobResult> {
    let filename = sanitize::redact_path(std::path::Path::new(&job.filename));
    let _job_span = info_span!("job",
        job_id = %job.id,
        filename = %filename,
        kind = job.kind().as_str(),
        attempt = job.attempt,
    )
    .entered();

    match context.handler.handle(&job, context.progress.as_ref()) {
        Ok(outcome) => {
            context.progress.report(
                &job,
                ProgressEvent::Succeeded {
                    degraded: outcome.degraded,
                },
            );
            info!("Job {} stored {}", job.id, filename);
            Some(JobResult::success(&job, outcome.degraded))
        }
        Err(e) if e.is_retryable() && job.attempt < context.retry.max_retries => {
            warn!(
                "Job {} attempt {} failed, retrying in {:?}: {}",
                job.id,
                job.attempt + 1,
                context.retry.backoff,
                e
            );
            context.progress.report(
                &job,
                ProgressEvent::Retrying {
                    error: e.to_string(),
                    backoff: context.retry.backoff,
                },
            );
            schedule_retry(job.next_attempt(), context);
            None
        }
        Err(e) => {
            error!("Job {} failed: {}", job.id, e);
            let error = e.to_string();
            context.progress.report(
                &job,
                ProgressEvent::Failed {
                    error: error.clone(),
                },
            );
            Some(JobResult::failure(&job, error))
        }
    }
}

/// Re-enqueues `job` after the backoff on a short-lived timer thread. The
/// timer gives up if the pool shuts down first.
fn schedule_retry(job: Job, context: &WorkerContext) {
    let sender = context.job_sender.clone();
    let shutdown = Arc::clone(&context.shutdown);
    let backoff = context.retry.backoff;
    let job_id = job.id.clone();

    let spawned = thread::Builder::new()
        .name(format!("retry-{}", job_id))
        .spawn(move || {
            let deadline = Instant::now() + backoff;
            while Instant::now() < deadline {
                if shutdown.load(Ordering::Relaxed) {
                    debug!("Dropping retry of job {} on shutdown", job.id);
                    return;
                }
                thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
            }
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            if sender.send(job).is_err() {
                debug!("Retry dropped: job channel closed");
            }
        });

    if let Err(e) = spawned {
        error!("Failed to schedule retry for job {}: {}", job_id, e);
    }
}
