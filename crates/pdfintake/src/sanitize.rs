//! Helpers for untrusted file names and for span attributes.
//!
//! Spans and logs only ever carry file names, never full paths.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// True when the name maps to the `application/pdf` MIME type.
pub fn is_pdf_filename(name: &str) -> bool {
    mime_guess::from_path(name)
        .first()
        .map(|m| m == mime_guess::mime::APPLICATION_PDF)
        .unwrap_or(false)
}

/// Reduces a client-supplied upload name to a bare file name.
///
/// Directory components (either separator) are dropped. Returns `None`
/// when nothing usable is left.
pub fn upload_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return None;
    }
    Some(name.to_string())
}
