pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod sanitize;
pub mod service;
pub mod status;
pub mod store;
pub mod worker;

pub use config::{load_config, Config, LoggingConfig, RetryConfig, ServerConfig};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, DispatchError, ExtractError, IntakeError, Result, WorkerError};
pub use extract::{extract_fields, extract_record, extract_text, Extraction, PdfSource};
pub use model::{ExtractedRecord, OrderStatus, PendingOrder, RecordUpdate};
pub use service::IntakeService;
pub use status::ProcessingStatus;
pub use store::RecordStore;
pub use worker::{Job, JobHandle, JobResult, WorkerPool};
