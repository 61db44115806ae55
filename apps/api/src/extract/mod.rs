//! File text extraction: turns uploaded bytes into plain text.
//!
//! Format dispatch happens once, on the declared extension. Every parser is a
//! pure function over the byte buffer and fails fast; there are no retries.

pub(crate) mod docx;
pub(crate) mod pdf;

use std::fmt;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Extensions accepted by the upload endpoints, in display order.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt"];

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
    Txt,
}

impl DocumentFormat {
    /// Resolves the format from a filename's extension, case-insensitively.
    pub fn from_filename(file_name: &str) -> Result<Self, ExtractError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            "doc" => Ok(DocumentFormat::Doc),
            "txt" => Ok(DocumentFormat::Txt),
            "" => Err(ExtractError::UnsupportedFormat("(none)".to_string())),
            other => Err(ExtractError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Doc => "DOC",
            DocumentFormat::Txt => "TXT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file format: {0}. Allowed: .pdf, .docx, .doc, .txt")]
    UnsupportedFormat(String),

    #[error("Could not extract text from {format} file: {reason}")]
    ParseFailure {
        format: DocumentFormat,
        reason: String,
    },

    #[error("Failed to read uploaded file: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    fn parse(format: DocumentFormat, reason: impl Into<String>) -> Self {
        ExtractError::ParseFailure {
            format,
            reason: reason.into(),
        }
    }
}

/// Extracts plain text from an in-memory document.
pub fn extract_text(data: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    let text = match format {
        DocumentFormat::Pdf => {
            pdf::extract_pdf_text(data).map_err(|e| ExtractError::parse(format, e.to_string()))?
        }
        DocumentFormat::Docx => docx::extract_docx_text(data)
            .map_err(|e| ExtractError::parse(format, e.to_string()))?,
        DocumentFormat::Doc => extract_legacy_doc(data)?,
        DocumentFormat::Txt => decode_plain_text(data),
    };

    let text = tidy_lines(&text);
    info!(
        "Extracted {} characters from {} document",
        text.chars().count(),
        format
    );
    Ok(text)
}

/// Reads a file from disk and extracts its text.
pub fn extract_file(path: &Path, format: DocumentFormat) -> Result<String, ExtractError> {
    let data = std::fs::read(path)?;
    extract_text(&data, format)
}

/// Legacy Word 97-2003 binaries are not parsed. A `.doc` that is really a
/// DOCX container (a common mis-naming) is handled as DOCX.
fn extract_legacy_doc(data: &[u8]) -> Result<String, ExtractError> {
    if data.starts_with(ZIP_MAGIC) {
        return docx::extract_docx_text(data)
            .map_err(|e| ExtractError::parse(DocumentFormat::Doc, e.to_string()));
    }
    let reason = if data.starts_with(OLE_MAGIC) {
        "legacy Word 97-2003 binary documents are not supported; \
         please upload a DOCX, PDF, or TXT version"
    } else {
        "file is not a recognisable Word document"
    };
    Err(ExtractError::parse(DocumentFormat::Doc, reason))
}

/// UTF-8 first (BOM dropped); anything else is read as Latin-1, which maps
/// every byte to a char and therefore cannot fail.
fn decode_plain_text(data: &[u8]) -> String {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => data.iter().map(|&b| b as char).collect(),
    }
}

/// Trims every line and drops blank ones.
fn tidy_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_filename("Resume.PDF").unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_filename("cv.final.docx").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_filename("old.doc").unwrap(),
            DocumentFormat::Doc
        );
        assert_eq!(
            DocumentFormat::from_filename("notes.txt").unwrap(),
            DocumentFormat::Txt
        );
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err = DocumentFormat::from_filename("photo.png").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref ext) if ext == ".png"));
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        assert!(matches!(
            DocumentFormat::from_filename("README"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_txt_extraction_trims_and_drops_blank_lines() {
        let text = extract_text(
            b"  Jane Doe  \r\n\r\n\r\nSkills:\n  Rust, Go\n",
            DocumentFormat::Txt,
        )
        .unwrap();
        assert_eq!(text, "Jane Doe\nSkills:\nRust, Go");
    }

    #[test]
    fn test_txt_extraction_strips_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"Hello");
        assert_eq!(extract_text(&data, DocumentFormat::Txt).unwrap(), "Hello");
    }

    #[test]
    fn test_txt_extraction_falls_back_to_latin1() {
        // "José" in Latin-1
        let data = [b'J', b'o', b's', 0xE9];
        assert_eq!(extract_text(&data, DocumentFormat::Txt).unwrap(), "José");
    }

    #[test]
    fn test_legacy_ole_doc_is_a_parse_failure() {
        let mut data = OLE_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        let err = extract_text(&data, DocumentFormat::Doc).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ParseFailure {
                format: DocumentFormat::Doc,
                ..
            }
        ));
        assert!(err.to_string().contains("DOCX"));
    }

    #[test]
    fn test_doc_that_is_really_docx_is_parsed() {
        let data = docx::tests::build_docx(&["Jane Doe", "Rust engineer"]);
        let text = extract_text(&data, DocumentFormat::Doc).unwrap();
        assert_eq!(text, "Jane Doe\nRust engineer");
    }

    #[test]
    fn test_garbage_pdf_is_a_parse_failure_not_a_crash() {
        let err = extract_text(b"definitely not a pdf", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ParseFailure {
                format: DocumentFormat::Pdf,
                ..
            }
        ));
    }

    #[test]
    fn test_extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.txt");
        std::fs::write(&path, "Rust\n\nGo").unwrap();
        assert_eq!(
            extract_file(&path, DocumentFormat::Txt).unwrap(),
            "Rust\nGo"
        );
    }

    #[test]
    fn test_extract_file_missing_path_is_io_error() {
        let err = extract_file(Path::new("/nonexistent/resume.txt"), DocumentFormat::Txt)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
