//! Pending-order repository: the `pending_orders` review queue.

use rusqlite::{params, OptionalExtension, Row};

use super::{now_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::{ExtractedRecord, OrderStatus, PendingOrder};

const ENTITY: &str = "PendingOrder";

/// A raw pending row. The snapshot stays as JSON text until decoded.
#[derive(Debug, Clone)]
struct PendingRow {
    id: i64,
    filename: String,
    pdf_data: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl PendingRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            pdf_data: row.get("pdf_data")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_order(self) -> Result<PendingOrder, DatabaseError> {
        let record: ExtractedRecord =
            serde_json::from_str(&self.pdf_data).map_err(|e| DatabaseError::Json {
                column: "pdf_data",
                source: e,
            })?;
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|_| DatabaseError::InvalidValue {
                column: "status",
                value: self.status.clone(),
            })?;

        Ok(PendingOrder {
            id: self.id,
            filename: self.filename,
            record,
            status,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

/// Outcome of a status change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Applied { from: OrderStatus },
    Refused { current: OrderStatus },
}

fn encode(record: &ExtractedRecord) -> Result<String, DatabaseError> {
    serde_json::to_string(record).map_err(|e| DatabaseError::Json {
        column: "pdf_data",
        source: e,
    })
}

fn not_found(id: i64) -> DatabaseError {
    DatabaseError::NotFound {
        entity: ENTITY,
        key: id.to_string(),
    }
}

/// Stores a snapshot of `record` with status `pending`. Returns the new id.
pub fn insert(db: &Database, record: &ExtractedRecord) -> Result<i64, DatabaseError> {
    let pdf_data = encode(record)?;
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO pending_orders (filename, pdf_data, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                record.filename,
                pdf_data,
                OrderStatus::Pending.as_str(),
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Orders with the given status, newest first.
pub fn list_by_status(
    db: &Database,
    status: OrderStatus,
) -> Result<Vec<PendingOrder>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM pending_orders WHERE status = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![status.as_str()], PendingRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(PendingRow::into_order).collect()
}

pub fn count_by_status(db: &Database, status: OrderStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM pending_orders WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Finds an order by id, whatever its status.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<PendingOrder>, DatabaseError> {
    let row = db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM pending_orders WHERE id = ?1",
                params![id],
                PendingRow::from_row,
            )
            .optional()?;
        Ok(row)
    })?;
    row.map(PendingRow::into_order).transpose()
}

/// Every order for `filename`, newest first. Duplicates are allowed.
pub fn find_by_filename(
    db: &Database,
    filename: &str,
) -> Result<Vec<PendingOrder>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM pending_orders WHERE filename = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![filename], PendingRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(PendingRow::into_order).collect()
}

/// Replaces the snapshot of order `id` and bumps `updated_at`. The status
/// is left alone.
pub fn update_snapshot(
    db: &Database,
    id: i64,
    record: &ExtractedRecord,
) -> Result<(), DatabaseError> {
    let pdf_data = encode(record)?;
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE pending_orders SET pdf_data = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, pdf_data, now_timestamp()],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    })
}

/// Moves order `id` to `next` if that is a forward transition. The check
/// and the write happen under one lock.
pub fn set_status(
    db: &Database,
    id: i64,
    next: OrderStatus,
) -> Result<StatusChange, DatabaseError> {
    db.with_conn(|conn| {
        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM pending_orders WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let current = current.ok_or_else(|| not_found(id))?;
        let current = current
            .parse::<OrderStatus>()
            .map_err(|_| DatabaseError::InvalidValue {
                column: "status",
                value: current.clone(),
            })?;

        if !current.can_transition_to(next) {
            return Ok(StatusChange::Refused { current });
        }

        conn.execute(
            "UPDATE pending_orders SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, next.as_str(), now_timestamp()],
        )?;
        Ok(StatusChange::Applied { from: current })
    })
}
