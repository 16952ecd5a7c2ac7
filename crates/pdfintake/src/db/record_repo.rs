//! Record repository: the `extractions` table, keyed by filename.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, now_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::ExtractedRecord;

const COLUMNS: &str = "filename, invoice_number, customer_name, customer_email, order_date,
    due_date, total_amount, tax_amount, currency, items_description, quantity, unit_price,
    billing_address, shipping_address, vendor_name, payment_terms, notes, content_preview,
    full_text, extracted_at";

/// A row whose SQL types decoded; the timestamp text is checked separately.
type Decoded = Result<ExtractedRecord, DatabaseError>;

fn from_row(row: &Row<'_>) -> Result<Decoded, rusqlite::Error> {
    let extracted_at: String = row.get("extracted_at")?;
    let extracted_at = match parse_timestamp("extracted_at", &extracted_at) {
        Ok(extracted_at) => extracted_at,
        Err(e) => return Ok(Err(e)),
    };

    Ok(Ok(ExtractedRecord {
        filename: row.get("filename")?,
        invoice_number: row.get("invoice_number")?,
        customer_name: row.get("customer_name")?,
        customer_email: row.get("customer_email")?,
        order_date: row.get("order_date")?,
        due_date: row.get("due_date")?,
        total_amount: row.get("total_amount")?,
        tax_amount: row.get("tax_amount")?,
        currency: row.get("currency")?,
        items_description: row.get("items_description")?,
        quantity: row.get("quantity")?,
        unit_price: row.get("unit_price")?,
        billing_address: row.get("billing_address")?,
        shipping_address: row.get("shipping_address")?,
        vendor_name: row.get("vendor_name")?,
        payment_terms: row.get("payment_terms")?,
        notes: row.get("notes")?,
        content_preview: row.get("content_preview")?,
        full_text: row.get("full_text")?,
        extracted_at,
    }))
}

/// Inserts the record, or replaces every field of the existing row with the
/// same filename. The surrogate id and `created_at` survive a replace.
/// Returns the row id.
pub fn upsert(db: &Database, record: &ExtractedRecord) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let id = conn.query_row(
            &format!(
                "INSERT INTO extractions ({COLUMNS}, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21)
                 ON CONFLICT(filename) DO UPDATE SET
                    invoice_number = excluded.invoice_number,
                    customer_name = excluded.customer_name,
                    customer_email = excluded.customer_email,
                    order_date = excluded.order_date,
                    due_date = excluded.due_date,
                    total_amount = excluded.total_amount,
                    tax_amount = excluded.tax_amount,
                    currency = excluded.currency,
                    items_description = excluded.items_description,
                    quantity = excluded.quantity,
                    unit_price = excluded.unit_price,
                    billing_address = excluded.billing_address,
                    shipping_address = excluded.shipping_address,
                    vendor_name = excluded.vendor_name,
                    payment_terms = excluded.payment_terms,
                    notes = excluded.notes,
                    content_preview = excluded.content_preview,
                    full_text = excluded.full_text,
                    extracted_at = excluded.extracted_at
                 RETURNING id"
            ),
            params![
                record.filename,
                record.invoice_number,
                record.customer_name,
                record.customer_email,
                record.order_date,
                record.due_date,
                record.total_amount,
                record.tax_amount,
                record.currency,
                record.items_description,
                record.quantity,
                record.unit_price,
                record.billing_address,
                record.shipping_address,
                record.vendor_name,
                record.payment_terms,
                record.notes,
                record.content_preview,
                record.full_text,
                format_timestamp(&record.extracted_at),
                now_timestamp(),
            ],
            |r| r.get(0),
        )?;
        Ok(id)
    })
}

/// Finds the record stored under `filename`.
pub fn find_by_filename(
    db: &Database,
    filename: &str,
) -> Result<Option<ExtractedRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let record = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM extractions WHERE filename = ?1"),
                params![filename],
                from_row,
            )
            .optional()?;
        record.transpose()
    })
}

/// All records, most recently created first.
pub fn list_all(db: &Database) -> Result<Vec<ExtractedRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM extractions ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    })
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM extractions", [], |r| r.get(0))?;
        Ok(count)
    })
}
