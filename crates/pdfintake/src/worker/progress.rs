//! Job progress reporting.

use std::time::Duration;

use crate::model::JobPhase;
use crate::store::RecordStore;
use crate::worker::job::Job;

/// Events emitted while a job moves through the pool.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Queued {
        max_retries: u32,
    },
    Phase {
        phase: JobPhase,
        message: String,
    },
    Retrying {
        error: String,
        backoff: Duration,
    },
    Succeeded {
        degraded: bool,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, job: &Job, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _job: &Job, _event: ProgressEvent) {}
}

/// Persists every transition into the `jobs` table, so status polls read
/// the same state the workers write.
pub struct StoreProgress {
    store: RecordStore,
}

impl StoreProgress {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }
}

impl ProgressReporter for StoreProgress {
    fn report(&self, job: &Job, event: ProgressEvent) {
        // Tracking failures must not fail the job itself.
        if let Err(e) = self.store.record_job_event(job, &event) {
            log::warn!("Failed to record progress for job {}: {}", job.id, e);
        }
    }
}
