use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid state transition for pending order {id}: {from} -> {to}")]
    InvalidTransition { id: i64, from: String, to: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IntakeError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// True when the error means "no such record/order/job", including
    /// not-found conditions raised by the storage layer.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IntakeError::NotFound { .. } | IntakeError::Database(DatabaseError::NotFound { .. })
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Failures decoding a PDF's text layer. These never reach `IntakeError`:
/// `extract_record` turns them into a degraded record.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load PDF: {0}")]
    PdfParse(String),
}

/// Failures of a dispatched job. Anything here enters the retry path
/// unless `is_retryable` says otherwise.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("File not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Failed to store extraction for '{filename}': {source}")]
    Store {
        filename: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Rejected job: {0}")]
    Rejected(String),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::SourceMissing(_) | DispatchError::Store { .. } => true,
            DispatchError::Rejected(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Failed to record job: {0}")]
    Tracking(#[from] DatabaseError),

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
