pub mod job;
pub mod pool;
pub mod progress;
pub mod runner;
pub mod scanner;

pub use job::{Job, JobHandle, JobResult, JobSource};
pub use pool::{RetryPolicy, WorkerPool};
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter, StoreProgress};
pub use runner::{ExtractionHandler, JobHandler, JobOutcome};
pub use scanner::DirectoryScanner;

pub use crossbeam_channel;
