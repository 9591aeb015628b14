//! Source file reading and text extraction.

use concierge_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    PlainText,
    Pdf,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") => Self::PlainText,
            Some("pdf") => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Short name stored as `file_type` in document metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::PlainText => "txt",
            Self::Pdf => "pdf",
            Self::Unknown => "unknown",
        }
    }

    /// Whether folder ingestion picks this type up.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Markdown | Self::PlainText | Self::Pdf)
    }
}

/// Read a document as plain text.
///
/// Text files with invalid UTF-8 are decoded lossily rather than rejected.
/// PDFs yield the text of each page followed by a newline.
pub fn read_document(path: &Path) -> AppResult<String> {
    match ContentType::from_path(path) {
        ContentType::Markdown | ContentType::PlainText => read_text(path),
        ContentType::Pdf => read_pdf(path),
        ContentType::Unknown => Err(AppError::Knowledge(format!(
            "Unsupported file type '{}' for {:?}",
            ContentType::Unknown.as_str(),
            path
        ))),
    }
}

fn read_pdf(path: &Path) -> AppResult<String> {
    let document = lopdf::Document::load(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open PDF {:?}: {}", path, e)))?;

    let mut text = String::new();
    for page in document.get_pages().into_keys() {
        match document.extract_text(&[page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => tracing::warn!("Skipping page {} of {:?}: {}", page, path, e),
        }
    }
    Ok(text)
}

fn read_text(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("{:?} is not valid UTF-8, decoding lossily", path);
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    if text.contains('\0') {
        return Err(AppError::Knowledge(format!(
            "{:?} looks like a binary file",
            path
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::write_pdf;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("notes.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("NOTES.TXT")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(Path::new("paper.pdf")),
            ContentType::Pdf
        );
        assert_eq!(
            ContentType::from_path(Path::new("main.rs")),
            ContentType::Unknown
        );
    }

    #[test]
    fn test_read_document_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "Hypertension is high blood pressure.").unwrap();

        let text = read_document(&path).unwrap();
        assert_eq!(text, "Hypertension is high blood pressure.");
    }

    #[test]
    fn test_read_document_lossy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.txt");
        fs::write(&path, [b'o', b'k', 0xB8, 0xDF, b'!']).unwrap();

        let text = read_document(&path).unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_read_document_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leaflet.pdf");
        write_pdf(&path, "Metformin lowers blood glucose");

        let text = read_document(&path).unwrap();
        assert!(text.contains("Metformin lowers blood glucose"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_read_document_broken_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, "%PDF-1.4").unwrap();

        let err = read_document(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to open PDF"));
    }

    #[test]
    fn test_read_document_rejects_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.rs");
        fs::write(&path, "fn main() {}").unwrap();

        let err = read_document(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }
}
