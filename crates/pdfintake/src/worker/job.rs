use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::extract::PdfSource;
use crate::model::JobKind;

/// Where a job reads its document from.
#[derive(Debug, Clone)]
pub enum JobSource {
    /// A file dropped into the watch folder.
    Path(PathBuf),
    /// An uploaded buffer. Shared so retries do not copy it.
    Bytes(Arc<Vec<u8>>),
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// Key the extracted record is stored under.
    pub filename: String,
    pub source: JobSource,
    /// Zero-based retry count.
    pub attempt: u32,
}

impl Job {
    fn new_internal(filename: String, source: JobSource) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename,
            source,
            attempt: 0,
        }
    }

    /// Creates a job for a file on disk. The record is keyed by the file name.
    pub fn from_path(path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::new_internal(filename, JobSource::Path(path))
    }

    /// Creates a job for an uploaded buffer.
    pub fn from_bytes(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new_internal(filename.into(), JobSource::Bytes(Arc::new(bytes)))
    }

    pub fn kind(&self) -> JobKind {
        match self.source {
            JobSource::Path(_) => JobKind::Path,
            JobSource::Bytes(_) => JobKind::Bytes,
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            JobSource::Path(path) => Some(path),
            JobSource::Bytes(_) => None,
        }
    }

    pub fn pdf_source(&self) -> PdfSource<'_> {
        match &self.source {
            JobSource::Path(path) => PdfSource::Path(path),
            JobSource::Bytes(bytes) => PdfSource::Bytes(bytes.as_slice()),
        }
    }

    /// The same job, one retry further along.
    pub fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

/// Returned by `submit`: what a client needs to poll the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub job_id: String,
    pub filename: String,
}

impl From<&Job> for JobHandle {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            filename: job.filename.clone(),
        }
    }
}

/// Terminal outcome of a job, emitted once per job after its last attempt.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub filename: String,
    pub success: bool,
    pub error: Option<String>,
    /// How many times the job ran.
    pub attempts: u32,
    /// The job succeeded by storing an error record.
    pub degraded: bool,
}

impl JobResult {
    pub fn success(job: &Job, degraded: bool) -> Self {
        Self {
            job_id: job.id.clone(),
            filename: job.filename.clone(),
            success: true,
            error: None,
            attempts: job.attempt + 1,
            degraded,
        }
    }

    pub fn failure(job: &Job, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            filename: job.filename.clone(),
            success: false,
            error: Some(error),
            attempts: job.attempt + 1,
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_job_uses_file_name() {
        let job = Job::from_path(PathBuf::from("/inbox/acme.pdf"));
        assert_eq!(job.filename, "acme.pdf");
        assert_eq!(job.kind(), JobKind::Path);
        assert_eq!(job.source_path(), Some(Path::new("/inbox/acme.pdf")));
        assert_eq!(job.attempt, 0);
    }

    #[test]
    fn test_bytes_job() {
        let job = Job::from_bytes(b"%PDF".to_vec(), "upload.pdf");
        assert_eq!(job.filename, "upload.pdf");
        assert_eq!(job.kind(), JobKind::Bytes);
        assert!(job.source_path().is_none());
        assert!(job.pdf_source().is_upload());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = Job::from_path(PathBuf::from("a.pdf"));
        let b = Job::from_path(PathBuf::from("a.pdf"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_next_attempt_keeps_identity() {
        let job = Job::from_bytes(vec![1, 2, 3], "x.pdf");
        let id = job.id.clone();
        let retried = job.next_attempt().next_attempt();
        assert_eq!(retried.id, id);
        assert_eq!(retried.attempt, 2);

        let result = JobResult::failure(&retried, "boom".to_string());
        assert_eq!(result.attempts, 3);
        assert!(!result.success);
    }

    #[test]
    fn test_handle_from_job() {
        let job = Job::from_path(PathBuf::from("/inbox/b.pdf"));
        let handle = JobHandle::from(&job);
        assert_eq!(handle.job_id, job.id);
        assert_eq!(handle.filename, "b.pdf");
    }
}
