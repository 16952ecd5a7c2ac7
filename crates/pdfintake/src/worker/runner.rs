use chrono::Utc;
use tracing::info_span;

use crate::error::DispatchError;
use crate::extract::extract_record;
use crate::model::JobPhase;
use crate::sanitize;
use crate::store::RecordStore;
use crate::worker::job::Job;
use crate::worker::progress::{ProgressEvent, ProgressReporter};

/// What a successful run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    pub degraded: bool,
}

/// Executes one attempt of a job. The pool owns retries.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: &Job, progress: &dyn ProgressReporter)
        -> Result<JobOutcome, DispatchError>;
}

/// Production handler: decode, extract, upsert.
pub struct ExtractionHandler {
    store: RecordStore,
}

impl ExtractionHandler {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }
}

fn phase(progress: &dyn ProgressReporter, job: &Job, phase: JobPhase) {
    progress.report(
        job,
        ProgressEvent::Phase {
            phase,
            message: phase.to_string(),
        },
    );
}

impl JobHandler for ExtractionHandler {
    fn handle(
        &self,
        job: &Job,
        progress: &dyn ProgressReporter,
    ) -> Result<JobOutcome, DispatchError> {
        if job.filename.trim().is_empty() {
            return Err(DispatchError::Rejected("job has no filename".to_string()));
        }
        if !sanitize::is_pdf_filename(&job.filename) {
            return Err(DispatchError::Rejected(format!(
                "not a PDF file name: {}",
                job.filename
            )));
        }

        {
            let _step = info_span!("read_source").entered();
            phase(progress, job, JobPhase::ReadingSource);
            if let Some(path) = job.source_path() {
                if !path.exists() {
                    return Err(DispatchError::SourceMissing(path.to_path_buf()));
                }
            }
        }

        let extraction = {
            let _step = info_span!("extract").entered();
            phase(progress, job, JobPhase::ExtractingText);
            extract_record(job.pdf_source(), &job.filename, Utc::now())
        };

        {
            let _step = info_span!("store").entered();
            phase(progress, job, JobPhase::Storing);
            self.store
                .upsert(&extraction.record)
                .map_err(|e| DispatchError::Store {
                    filename: job.filename.clone(),
                    source: e,
                })?;
        }

        Ok(JobOutcome {
            degraded: extraction.degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::worker::progress::NoopProgress;
    use std::path::PathBuf;

    fn handler() -> (ExtractionHandler, RecordStore) {
        let store = RecordStore::new(Database::open_in_memory().unwrap());
        (ExtractionHandler::new(store.clone()), store)
    }

    #[test]
    fn test_missing_source_is_retryable() {
        let (handler, store) = handler();
        let job = Job::from_path(PathBuf::from("/nonexistent/inbox/a.pdf"));
        let err = handler.handle(&job, &NoopProgress).unwrap_err();
        assert!(matches!(err, DispatchError::SourceMissing(_)));
        assert!(err.is_retryable());
        assert!(store.find("a.pdf").unwrap().is_none());
    }

    #[test]
    fn test_non_pdf_name_is_rejected() {
        let (handler, _) = handler();
        let job = Job::from_bytes(b"%PDF-1.5".to_vec(), "notes.txt");
        let err = handler.handle(&job, &NoopProgress).unwrap_err();
        assert!(matches!(err, DispatchError::Rejected(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_corrupt_upload_stores_degraded_record() {
        let (handler, store) = handler();
        let job = Job::from_bytes(b"definitely not a pdf".to_vec(), "broken.pdf");
        let outcome = handler.handle(&job, &NoopProgress).unwrap();
        assert!(outcome.degraded);

        let record = store.find("broken.pdf").unwrap().unwrap();
        assert!(record
            .content_preview
            .starts_with("Error processing uploaded PDF: "));
        assert!(record.invoice_number.is_none());
    }

    #[test]
    fn test_store_failure_maps_to_store_error() {
        let (handler, store) = handler();
        store
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE extractions;")?;
                Ok(())
            })
            .unwrap();

        let job = Job::from_bytes(b"junk".to_vec(), "a.pdf");
        let err = handler.handle(&job, &NoopProgress).unwrap_err();
        assert!(matches!(err, DispatchError::Store { .. }));
        assert!(err.is_retryable());
    }
}
