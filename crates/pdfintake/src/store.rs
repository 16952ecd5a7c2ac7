//! Record store: the single source of truth for records, pending orders and
//! job state.
//!
//! Thin typed façade over the repository modules. Every failure is logged
//! here and returned to the caller.

use chrono::Utc;

use crate::db::job_repo::{self, JobUpdate};
use crate::db::pending_repo::{self, StatusChange};
use crate::db::{record_repo, Database, DatabaseError};
use crate::model::{ExtractedRecord, JobPhase, JobRecord, JobState, OrderStatus, PendingOrder};
use crate::worker::job::Job;
use crate::worker::progress::ProgressEvent;

fn logged<T>(operation: &str, result: Result<T, DatabaseError>) -> Result<T, DatabaseError> {
    if let Err(ref e) = result {
        log::error!("Store operation '{}' failed: {}", operation, e);
    }
    result
}

#[derive(Clone)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // Records

    /// Inserts or replaces the record keyed by its filename.
    pub fn upsert(&self, record: &ExtractedRecord) -> Result<i64, DatabaseError> {
        logged("upsert", record_repo::upsert(&self.db, record))
    }

    pub fn find(&self, filename: &str) -> Result<Option<ExtractedRecord>, DatabaseError> {
        logged("find", record_repo::find_by_filename(&self.db, filename))
    }

    pub fn list_all(&self) -> Result<Vec<ExtractedRecord>, DatabaseError> {
        logged("list_all", record_repo::list_all(&self.db))
    }

    // Pending queue

    pub fn insert_pending(&self, record: &ExtractedRecord) -> Result<i64, DatabaseError> {
        logged("insert_pending", pending_repo::insert(&self.db, record))
    }

    /// Orders still awaiting review, newest first.
    pub fn list_pending(&self) -> Result<Vec<PendingOrder>, DatabaseError> {
        logged(
            "list_pending",
            pending_repo::list_by_status(&self.db, OrderStatus::Pending),
        )
    }

    pub fn get_pending(&self, id: i64) -> Result<Option<PendingOrder>, DatabaseError> {
        logged("get_pending", pending_repo::find_by_id(&self.db, id))
    }

    pub fn find_pending_by_filename(
        &self,
        filename: &str,
    ) -> Result<Vec<PendingOrder>, DatabaseError> {
        logged(
            "find_pending_by_filename",
            pending_repo::find_by_filename(&self.db, filename),
        )
    }

    /// Replaces the snapshot of order `id`. Unknown ids are `NotFound`.
    pub fn update_pending(&self, id: i64, record: &ExtractedRecord) -> Result<(), DatabaseError> {
        logged(
            "update_pending",
            pending_repo::update_snapshot(&self.db, id, record),
        )
    }

    pub fn set_pending_status(
        &self,
        id: i64,
        status: OrderStatus,
    ) -> Result<StatusChange, DatabaseError> {
        logged(
            "set_pending_status",
            pending_repo::set_status(&self.db, id, status),
        )
    }

    pub fn count_pending(&self) -> Result<u64, DatabaseError> {
        logged(
            "count_pending",
            pending_repo::count_by_status(&self.db, OrderStatus::Pending),
        )
    }

    // Jobs

    pub fn job(&self, id: &str) -> Result<Option<JobRecord>, DatabaseError> {
        logged("job", job_repo::find_by_id(&self.db, id))
    }

    pub fn active_job_for(&self, filename: &str) -> Result<Option<JobRecord>, DatabaseError> {
        logged(
            "active_job_for",
            job_repo::find_active_by_filename(&self.db, filename),
        )
    }

    /// Fails jobs left unfinished by a previous process.
    pub fn fail_unfinished_jobs(&self) -> Result<usize, DatabaseError> {
        logged(
            "fail_unfinished_jobs",
            job_repo::fail_unfinished(&self.db, "Interrupted by shutdown"),
        )
    }

    /// Writes one progress event for `job`.
    pub fn record_job_event(&self, job: &Job, event: &ProgressEvent) -> Result<(), DatabaseError> {
        let result = match event {
            ProgressEvent::Queued { max_retries } => {
                let now = Utc::now();
                job_repo::insert(
                    &self.db,
                    &JobRecord {
                        id: job.id.clone(),
                        filename: job.filename.clone(),
                        kind: job.kind(),
                        source_path: job.source_path().map(|p| p.to_string_lossy().to_string()),
                        state: JobState::Queued,
                        phase: JobPhase::Queued,
                        attempt: job.attempt,
                        max_retries: *max_retries,
                        message: Some(JobPhase::Queued.to_string()),
                        error: None,
                        degraded: false,
                        created_at: now,
                        updated_at: now,
                        completed_at: None,
                    },
                )
            }
            ProgressEvent::Phase { phase, message } => job_repo::update_progress(
                &self.db,
                &job.id,
                &JobUpdate {
                    state: JobState::Processing,
                    phase: *phase,
                    attempt: job.attempt,
                    message: message.as_str(),
                    error: None,
                    degraded: false,
                },
            ),
            ProgressEvent::Retrying { error, backoff } => {
                let message = format!(
                    "Attempt {} failed, retrying in {}s",
                    job.attempt + 1,
                    backoff.as_secs()
                );
                job_repo::update_progress(
                    &self.db,
                    &job.id,
                    &JobUpdate {
                        state: JobState::Retrying,
                        phase: JobPhase::WaitingRetry,
                        attempt: job.attempt,
                        message: &message,
                        error: Some(error.as_str()),
                        degraded: false,
                    },
                )
            }
            ProgressEvent::Succeeded { degraded } => {
                let message = if *degraded {
                    "Stored error record"
                } else {
                    "Extraction stored"
                };
                job_repo::update_progress(
                    &self.db,
                    &job.id,
                    &JobUpdate {
                        state: JobState::Succeeded,
                        phase: JobPhase::Completed,
                        attempt: job.attempt,
                        message,
                        error: None,
                        degraded: *degraded,
                    },
                )
            }
            ProgressEvent::Failed { error } => job_repo::update_progress(
                &self.db,
                &job.id,
                &JobUpdate {
                    state: JobState::Failed,
                    phase: JobPhase::Failed,
                    attempt: job.attempt,
                    message: "Failed",
                    error: Some(error.as_str()),
                    degraded: false,
                },
            ),
        };
        logged("record_job_event", result)
    }
}
