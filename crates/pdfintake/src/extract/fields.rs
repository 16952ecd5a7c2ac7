//! Regex heuristics that turn decoded text into a partial record.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::ExtractedRecord;

pub const PREVIEW_CHARS: usize = 200;
pub const EMPTY_PREVIEW: &str = "No content extracted";

static INVOICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)invoice[#\s]+([A-Z0-9-]+)").expect("invoice pattern is valid")
});

static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)total[:\s]*\$?([0-9,]+\.?[0-9]*)").expect("total pattern is valid")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email pattern is valid")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").expect("date pattern is valid")
});

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Builds the preview shown in listings: the first 200 characters, or a
/// placeholder for documents without a text layer.
pub fn content_preview(text: &str) -> String {
    if text.is_empty() {
        EMPTY_PREVIEW.to_string()
    } else {
        text.chars().take(PREVIEW_CHARS).collect()
    }
}

/// Extracts the known fields from `text`. Pure: the same input always yields
/// the same record. A pattern that does not match leaves its field unset.
pub fn extract_fields(text: &str, filename: &str, extracted_at: DateTime<Utc>) -> ExtractedRecord {
    let mut record = ExtractedRecord::empty(filename, content_preview(text), extracted_at);

    record.invoice_number = first_capture(&INVOICE_RE, text);
    record.total_amount = first_capture(&TOTAL_RE, text).and_then(|raw| parse_amount(&raw));
    record.customer_email = EMAIL_RE.find(text).map(|m| m.as_str().to_string());
    record.order_date = DATE_RE.find(text).map(|m| m.as_str().to_string());
    record.full_text = text.to_string();

    record
}
