//! Text decoding and field extraction.

pub mod fields;
pub mod text;

use chrono::{DateTime, Utc};

use crate::model::ExtractedRecord;

pub use fields::{content_preview, extract_fields, EMPTY_PREVIEW, PREVIEW_CHARS};
pub use text::{extract_text, PdfSource};

pub const PATH_ERROR_PREFIX: &str = "Error processing PDF";
pub const UPLOAD_ERROR_PREFIX: &str = "Error processing uploaded PDF";

/// Result of running both extractors over one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: ExtractedRecord,
    /// True when the text layer could not be decoded and `record` carries
    /// the error message instead of extracted fields.
    pub degraded: bool,
}

/// A record that only reports why decoding failed.
pub fn build_error_record(
    filename: &str,
    message: impl Into<String>,
    extracted_at: DateTime<Utc>,
) -> ExtractedRecord {
    ExtractedRecord::empty(filename, message, extracted_at)
}

/// Decodes `source` and extracts its fields. Decode failures never escape:
/// they become a degraded record.
pub fn extract_record(source: PdfSource<'_>, filename: &str, now: DateTime<Utc>) -> Extraction {
    match extract_text(source) {
        Ok(text) => {
            let _span = tracing::info_span!("extract_fields").entered();
            Extraction {
                record: extract_fields(&text, filename, now),
                degraded: false,
            }
        }
        Err(e) => {
            let prefix = if source.is_upload() {
                UPLOAD_ERROR_PREFIX
            } else {
                PATH_ERROR_PREFIX
            };
            tracing::warn!(filename = %filename, error = %e, "Text extraction failed");
            Extraction {
                record: build_error_record(filename, format!("{}: {}", prefix, e), now),
                degraded: true,
            }
        }
    }
}
