//! Job repository: CRUD operations for the `jobs` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, now_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::{JobKind, JobPhase, JobRecord, JobState};

/// A raw job row from the database.
#[derive(Debug, Clone)]
struct JobRow {
    id: String,
    filename: String,
    kind: String,
    source_path: Option<String>,
    state: String,
    phase: String,
    attempt: u32,
    max_retries: u32,
    message: Option<String>,
    error: Option<String>,
    degraded: bool,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            kind: row.get("kind")?,
            source_path: row.get("source_path")?,
            state: row.get("state")?,
            phase: row.get("phase")?,
            attempt: row.get("attempt")?,
            max_retries: row.get("max_retries")?,
            message: row.get("message")?,
            error: row.get("error")?,
            degraded: row.get("degraded")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }

    fn into_record(self) -> Result<JobRecord, DatabaseError> {
        let invalid = |column: &'static str, value: &str| DatabaseError::InvalidValue {
            column,
            value: value.to_string(),
        };

        Ok(JobRecord {
            kind: self.kind.parse().map_err(|_| invalid("kind", &self.kind))?,
            state: self.state.parse().map_err(|_| invalid("state", &self.state))?,
            phase: self.phase.parse().map_err(|_| invalid("phase", &self.phase))?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(|ts| parse_timestamp("completed_at", ts))
                .transpose()?,
            id: self.id,
            filename: self.filename,
            source_path: self.source_path,
            attempt: self.attempt,
            max_retries: self.max_retries,
            message: self.message,
            error: self.error,
            degraded: self.degraded,
        })
    }
}

/// A progress transition to write onto an existing job row.
#[derive(Debug, Clone)]
pub struct JobUpdate<'a> {
    pub state: JobState,
    pub phase: JobPhase,
    pub attempt: u32,
    pub message: &'a str,
    pub error: Option<&'a str>,
    pub degraded: bool,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRecord) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, filename, kind, source_path, state, phase, attempt,
             max_retries, message, error, degraded, created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.id,
                job.filename,
                job.kind.as_str(),
                job.source_path,
                job.state.as_str(),
                job.phase.as_str(),
                job.attempt,
                job.max_retries,
                job.message,
                job.error,
                job.degraded,
                format_timestamp(&job.created_at),
                format_timestamp(&job.updated_at),
                job.completed_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(())
    })
}

/// Writes a progress transition. `completed_at` is stamped when the new
/// state is terminal.
pub fn update_progress(
    db: &Database,
    id: &str,
    update: &JobUpdate<'_>,
) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    let completed_at = update.state.is_terminal().then(|| now.clone());
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET state = ?2, phase = ?3, attempt = ?4, message = ?5, error = ?6,
             degraded = ?7, updated_at = ?8, completed_at = COALESCE(?9, completed_at)
             WHERE id = ?1",
            params![
                id,
                update.state.as_str(),
                update.phase.as_str(),
                update.attempt,
                update.message,
                update.error,
                update.degraded,
                now,
                completed_at,
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "Job",
                key: id.to_string(),
            });
        }
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRecord>, DatabaseError> {
    let row = db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })?;
    row.map(JobRow::into_record).transpose()
}

/// The most recent job for `filename` that has not reached a terminal state.
pub fn find_active_by_filename(
    db: &Database,
    filename: &str,
) -> Result<Option<JobRecord>, DatabaseError> {
    let row = db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs
                 WHERE filename = ?1 AND state IN ('queued', 'processing', 'retrying')
                 ORDER BY created_at DESC LIMIT 1",
                params![filename],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })?;
    row.map(JobRow::into_record).transpose()
}

/// Counts jobs in the given state.
pub fn count_by_state(db: &Database, state: JobState) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE state = ?1",
            params![state.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Marks every non-terminal job as failed. Used at startup, when no worker
/// can still own one. Returns how many rows changed.
pub fn fail_unfinished(db: &Database, reason: &str) -> Result<usize, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET state = 'failed', phase = 'failed', error = ?1, message = ?1,
             updated_at = ?2, completed_at = ?2
             WHERE state IN ('queued', 'processing', 'retrying')",
            params![reason, now],
        )?;
        Ok(changed)
    })
}
