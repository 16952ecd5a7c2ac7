//! Persisted state of dispatched extraction jobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a job: `queued -> processing -> {succeeded, retrying, failed}`,
/// with `retrying -> processing` for each further attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Retrying,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Retrying => "retrying",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobState::Queued),
            "processing" => Ok(JobState::Processing),
            "retrying" => Ok(JobState::Retrying),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state: {}", other)),
        }
    }
}

/// Fine-grained step inside a state, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    ReadingSource,
    ExtractingText,
    Storing,
    WaitingRetry,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Queued => "queued",
            JobPhase::ReadingSource => "reading_source",
            JobPhase::ExtractingText => "extracting_text",
            JobPhase::Storing => "storing",
            JobPhase::WaitingRetry => "waiting_retry",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::ReadingSource => write!(f, "Reading source"),
            JobPhase::ExtractingText => write!(f, "Extracting text"),
            JobPhase::Storing => write!(f, "Storing"),
            JobPhase::WaitingRetry => write!(f, "Waiting to retry"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for JobPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobPhase::Queued),
            "reading_source" => Ok(JobPhase::ReadingSource),
            "extracting_text" => Ok(JobPhase::ExtractingText),
            "storing" => Ok(JobPhase::Storing),
            "waiting_retry" => Ok(JobPhase::WaitingRetry),
            "completed" => Ok(JobPhase::Completed),
            "failed" => Ok(JobPhase::Failed),
            other => Err(format!("unknown job phase: {}", other)),
        }
    }
}

/// Whether a job reads its document from the watch folder or from an
/// uploaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Path,
    Bytes,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Path => "path",
            JobKind::Bytes => "bytes",
        }
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(JobKind::Path),
            "bytes" => Ok(JobKind::Bytes),
            other => Err(format!("unknown job kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub filename: String,
    pub kind: JobKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    pub state: JobState,
    pub phase: JobPhase,
    /// Zero-based retry count.
    pub attempt: u32,
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the job stored an error record instead of extracted fields.
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
