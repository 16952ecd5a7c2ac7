use std::path::Path;

use log::warn;

use crate::error::ExtractError;

/// Where a document's bytes come from.
#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    Bytes(&'a [u8]),
    Path(&'a Path),
}

impl PdfSource<'_> {
    pub fn is_upload(&self) -> bool {
        matches!(self, PdfSource::Bytes(_))
    }
}

/// Decodes the text layer of every page, in document order.
///
/// Each page that yields text is followed by a newline. Pages the decoder
/// cannot handle are skipped with a warning; only an unreadable or
/// unparsable document is an error.
pub fn extract_text(source: PdfSource<'_>) -> Result<String, ExtractError> {
    let _span = tracing::info_span!("extract_text").entered();

    let owned;
    let bytes = match source {
        PdfSource::Bytes(bytes) => bytes,
        PdfSource::Path(path) => {
            owned = std::fs::read(path).map_err(|e| ExtractError::ReadDocument {
                path: path.to_path_buf(),
                source: e,
            })?;
            owned.as_slice()
        }
    };

    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::PdfParse(e.to_string()))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) if !page_text.is_empty() => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping page {}: {}", page_num, e),
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_a_parse_error() {
        let result = extract_text(PdfSource::Bytes(b"not a valid pdf content"));
        assert!(matches!(result, Err(ExtractError::PdfParse(_))));
    }

    #[test]
    fn test_empty_buffer_is_a_parse_error() {
        let result = extract_text(PdfSource::Bytes(&[]));
        assert!(matches!(result, Err(ExtractError::PdfParse(_))));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let result = extract_text(PdfSource::Path(Path::new("/nonexistent/invoice.pdf")));
        assert!(matches!(result, Err(ExtractError::ReadDocument { .. })));
    }

    #[test]
    fn test_source_kind() {
        assert!(PdfSource::Bytes(b"x").is_upload());
        assert!(!PdfSource::Path(Path::new("a.pdf")).is_upload());
    }
}
