//! Per-filename processing status.
//!
//! Resolution order: stored record, then the review queue, then a job still
//! in flight or a file waiting in the watch folder.

use std::path::Path;

use serde::Serialize;

use crate::db::DatabaseError;
use crate::model::{ExtractedRecord, JobRecord, OrderStatus};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingStatus {
    /// A record is stored under this filename.
    Completed(Box<ExtractedRecord>),
    /// Not stored, but a snapshot awaits review.
    Pending { pending_id: i64 },
    /// A job is queued or running, or the file sits in the watch folder.
    Processing { job: Option<Box<JobRecord>> },
    NotFound,
}

/// Wire shape of a status answer.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub filename: String,
    pub processed: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobRecord>,
}

impl ProcessingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingStatus::Completed(_) => "completed",
            ProcessingStatus::Pending { .. } => "pending",
            ProcessingStatus::Processing { .. } => "processing",
            ProcessingStatus::NotFound => "not_found",
        }
    }

    /// True once extraction has produced a record, stored or in review.
    pub fn is_processed(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Completed(_) | ProcessingStatus::Pending { .. }
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            ProcessingStatus::Completed(_) => "PDF has been processed and stored in database",
            ProcessingStatus::Pending { .. } => "PDF has been processed and is in pending orders",
            ProcessingStatus::Processing { .. } => "PDF is being processed or waiting in queue",
            ProcessingStatus::NotFound => "PDF not found in system",
        }
    }

    pub fn into_report(self, filename: impl Into<String>) -> StatusReport {
        let mut report = StatusReport {
            status: self.label(),
            filename: filename.into(),
            processed: self.is_processed(),
            message: self.message(),
            data: None,
            pending_id: None,
            job: None,
        };
        match self {
            ProcessingStatus::Completed(record) => report.data = Some(*record),
            ProcessingStatus::Pending { pending_id } => report.pending_id = Some(pending_id),
            ProcessingStatus::Processing { job } => report.job = job.map(|j| *j),
            ProcessingStatus::NotFound => {}
        }
        report
    }
}

/// True when `filename` sits in `folder`, either as-is or behind the unique
/// prefix given to uploads saved there.
fn present_in_folder(folder: &Path, filename: &str) -> bool {
    if folder.join(filename).is_file() {
        return true;
    }
    let suffix = format!("_{}", filename);
    match std::fs::read_dir(folder) {
        Ok(entries) => entries.filter_map(|e| e.ok()).any(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(&suffix))
                .unwrap_or(false)
        }),
        Err(_) => false,
    }
}

pub fn resolve(
    store: &RecordStore,
    watch_directory: &Path,
    filename: &str,
) -> Result<ProcessingStatus, DatabaseError> {
    if let Some(record) = store.find(filename)? {
        return Ok(ProcessingStatus::Completed(Box::new(record)));
    }

    let pending = store
        .find_pending_by_filename(filename)?
        .into_iter()
        .find(|order| order.status == OrderStatus::Pending);
    if let Some(order) = pending {
        return Ok(ProcessingStatus::Pending {
            pending_id: order.id,
        });
    }

    if let Some(job) = store.active_job_for(filename)? {
        return Ok(ProcessingStatus::Processing {
            job: Some(Box::new(job)),
        });
    }

    if present_in_folder(watch_directory, filename) {
        return Ok(ProcessingStatus::Processing { job: None });
    }

    Ok(ProcessingStatus::NotFound)
}
