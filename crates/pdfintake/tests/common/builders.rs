//! Builders for test fixtures.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// Builds a one-page PDF whose text layer holds the given lines.
pub struct PdfBuilder {
    lines: Vec<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    /// The invoice used across tests: `AB-123`, `$1,234.56`,
    /// `jane@example.com`, `03/14/2024`.
    pub fn sample_invoice() -> Self {
        Self::new()
            .line("ACME Corp")
            .line("Invoice #AB-123")
            .line("Bill to jane@example.com")
            .line("Date 03/14/2024")
            .line("Total: $1,234.56")
    }

    fn escape(text: &str) -> String {
        text.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    fn content(&self) -> String {
        let mut content = String::new();
        let mut y = 750;
        for line in &self.lines {
            content.push_str(&format!(
                "BT /F1 12 Tf 50 {} Td ({}) Tj ET\n",
                y,
                Self::escape(line)
            ));
            y -= 20;
        }
        content
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            self.content().into_bytes(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to serialize PDF");
        bytes
    }
}
