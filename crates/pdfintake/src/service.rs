//! Operations behind the HTTP surface.
//!
//! Every method is synchronous and may block on the database; async callers
//! run them on a blocking thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::db::pending_repo::StatusChange;
use crate::error::{IntakeError, Result, WorkerError};
use crate::model::{
    ExtractedRecord, FieldInfo, JobRecord, OrderStatus, PendingOrder, RecordUpdate,
    EDITABLE_FIELDS,
};
use crate::sanitize;
use crate::status::{self, ProcessingStatus};
use crate::store::RecordStore;
use crate::worker::{JobHandle, WorkerPool};

/// An upload written into the watch folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedUpload {
    /// Name on disk, and the key the record will be stored under.
    pub filename: String,
    pub original_filename: String,
    pub path: PathBuf,
}

#[derive(Clone)]
pub struct IntakeService {
    store: RecordStore,
    watch_directory: PathBuf,
    pool: Option<Arc<WorkerPool>>,
}

impl IntakeService {
    pub fn new(store: RecordStore, watch_directory: impl Into<PathBuf>) -> Self {
        Self {
            store,
            watch_directory: watch_directory.into(),
            pool: None,
        }
    }

    /// Attaches the pool uploads are dispatched to.
    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn watch_directory(&self) -> &Path {
        &self.watch_directory
    }

    pub fn model_schema(&self) -> &'static [FieldInfo] {
        EDITABLE_FIELDS
    }

    // Records

    pub fn list_records(&self) -> Result<Vec<ExtractedRecord>> {
        Ok(self.store.list_all()?)
    }

    pub fn get_record(&self, filename: &str) -> Result<ExtractedRecord> {
        self.store
            .find(filename)?
            .ok_or_else(|| IntakeError::not_found("Record", filename))
    }

    /// Merges the set fields of `update` into the stored record.
    pub fn update_record(&self, filename: &str, update: &RecordUpdate) -> Result<ExtractedRecord> {
        let mut record = self.get_record(filename)?;
        update.apply_to(&mut record);
        self.store.upsert(&record)?;
        log::info!("Updated record {}", filename);
        Ok(record)
    }

    /// Confirms the record exists in the store.
    pub fn commit_record(&self, filename: &str) -> Result<ExtractedRecord> {
        self.get_record(filename)
    }

    // Pending queue

    /// Copies the stored record into the review queue.
    pub fn send_to_pending(&self, filename: &str) -> Result<PendingOrder> {
        let record = self.get_record(filename)?;
        let id = self.store.insert_pending(&record)?;
        log::info!("Sent {} to pending as order {}", filename, id);
        self.get_pending(id)
    }

    pub fn list_pending(&self) -> Result<Vec<PendingOrder>> {
        Ok(self.store.list_pending()?)
    }

    pub fn count_pending(&self) -> Result<u64> {
        Ok(self.store.count_pending()?)
    }

    pub fn get_pending(&self, id: i64) -> Result<PendingOrder> {
        self.store
            .get_pending(id)?
            .ok_or_else(|| IntakeError::not_found("PendingOrder", id.to_string()))
    }

    /// Merges `update` into the snapshot of an order still awaiting review.
    pub fn update_pending(&self, id: i64, update: &RecordUpdate) -> Result<PendingOrder> {
        let mut order = self.get_pending(id)?;
        if !order.status.is_editable() {
            return Err(IntakeError::InvalidTransition {
                id,
                from: order.status.to_string(),
                to: "edited".to_string(),
            });
        }

        update.apply_to(&mut order.record);
        self.store.update_pending(id, &order.record)?;
        self.get_pending(id)
    }

    /// Writes the snapshot back into the store and marks the order completed.
    pub fn commit_pending(&self, id: i64) -> Result<PendingOrder> {
        let order = self.get_pending(id)?;
        let refused = |current: OrderStatus| IntakeError::InvalidTransition {
            id,
            from: current.to_string(),
            to: OrderStatus::Completed.to_string(),
        };

        if !order.status.can_transition_to(OrderStatus::Completed) {
            return Err(refused(order.status));
        }

        self.store.upsert(&order.record)?;
        match self.store.set_pending_status(id, OrderStatus::Completed)? {
            StatusChange::Applied { from } => {
                log::info!("Committed pending order {} ({} -> completed)", id, from);
            }
            StatusChange::Refused { current } => return Err(refused(current)),
        }
        self.get_pending(id)
    }

    // Jobs

    fn pool(&self) -> Result<&WorkerPool> {
        self.pool
            .as_deref()
            .ok_or(IntakeError::Worker(WorkerError::ChannelClosed))
    }

    fn validate_upload(raw_filename: &str) -> Result<String> {
        let filename = sanitize::upload_filename(raw_filename)
            .ok_or_else(|| IntakeError::InvalidUpload("missing file name".to_string()))?;
        if !sanitize::is_pdf_filename(&filename) {
            return Err(IntakeError::InvalidUpload(
                "Only PDF files are allowed".to_string(),
            ));
        }
        Ok(filename)
    }

    /// Dispatches an uploaded PDF for extraction.
    pub fn submit_upload(&self, bytes: Vec<u8>, raw_filename: &str) -> Result<JobHandle> {
        let filename = Self::validate_upload(raw_filename)?;
        let handle = self.pool()?.submit_bytes(bytes, filename)?;
        log::info!("Queued upload {} as job {}", handle.filename, handle.job_id);
        Ok(handle)
    }

    /// Writes an uploaded PDF into the watch folder under a unique name; the
    /// folder watcher picks it up from there.
    pub fn save_to_folder(&self, bytes: &[u8], raw_filename: &str) -> Result<SavedUpload> {
        let original_filename = Self::validate_upload(raw_filename)?;
        let filename = format!("{}_{}", uuid::Uuid::new_v4().simple(), original_filename);

        std::fs::create_dir_all(&self.watch_directory).map_err(|e| IntakeError::Io {
            path: self.watch_directory.clone(),
            source: e,
        })?;
        let path = self.watch_directory.join(&filename);
        std::fs::write(&path, bytes).map_err(|e| IntakeError::Io {
            path: path.clone(),
            source: e,
        })?;

        log::info!("Saved upload {} as {}", original_filename, filename);
        Ok(SavedUpload {
            filename,
            original_filename,
            path,
        })
    }

    pub fn task_status(&self, job_id: &str) -> Result<JobRecord> {
        self.store
            .job(job_id)?
            .ok_or_else(|| IntakeError::not_found("Job", job_id))
    }

    pub fn processing_status(&self, filename: &str) -> Result<ProcessingStatus> {
        Ok(status::resolve(&self.store, &self.watch_directory, filename)?)
    }
}
