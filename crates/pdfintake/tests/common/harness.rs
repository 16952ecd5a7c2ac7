//! Test harness for isolated test execution.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use pdfintake::worker::{ExtractionHandler, RetryPolicy, StoreProgress, WorkerPool};
use pdfintake::{Database, IntakeService, JobResult, RecordStore};

use super::builders::PdfBuilder;

/// How long a test waits for a job to reach a terminal state.
pub const RESULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        backoff: Duration::from_millis(20),
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub watch_dir: PathBuf,
    pub store: RecordStore,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watch_dir = temp_dir.path().join("pdfs");
        std::fs::create_dir_all(&watch_dir).expect("Failed to create watch directory");

        let db = Database::open_in_memory().expect("Failed to open database");

        Self {
            temp_dir,
            watch_dir,
            store: RecordStore::new(db),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A pool wired the way the server wires it.
    pub fn pool(&self, workers: usize, retry: RetryPolicy) -> WorkerPool {
        WorkerPool::new(
            Arc::new(ExtractionHandler::new(self.store.clone())),
            Arc::new(StoreProgress::new(self.store.clone())),
            workers,
            retry,
        )
    }

    pub fn service(&self) -> IntakeService {
        IntakeService::new(self.store.clone(), &self.watch_dir)
    }

    pub fn write_pdf(&self, name: &str, pdf: &PdfBuilder) -> PathBuf {
        let path = self.watch_dir.join(name);
        std::fs::write(&path, pdf.build()).expect("Failed to write PDF");
        path
    }

    /// Makes every record upsert fail from now on.
    pub fn break_record_table(&self) {
        self.store
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE extractions;")?;
                Ok(())
            })
            .expect("Failed to drop table");
    }

    pub fn wait_result(pool: &WorkerPool) -> JobResult {
        pool.recv_result_timeout(RESULT_TIMEOUT)
            .expect("Timed out waiting for job result")
    }
}
