//! Text extraction for uploaded documents.
//!
//! Transports hand over raw bytes plus a declared [`FileType`]; this
//! module returns the plain UTF-8 text that gets chunked and searched.
//! PDF goes through `pdf-extract`, HTML through `html2text`, and text or
//! markdown is decoded as UTF-8 as-is.

use thiserror::Error;

use crate::models::FileType;

/// Wrap width handed to `html2text`. Wide enough that paragraphs are not
/// broken into short lines, which would skew chunk boundaries.
const HTML_WRAP_WIDTH: usize = 10_000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("HTML extraction failed: {0}")]
    Html(String),
}

/// Extract plain text from `bytes` according to the declared type.
pub fn extract_text(bytes: &[u8], file_type: FileType) -> Result<String, ExtractError> {
    match file_type {
        FileType::Text | FileType::Markdown => Ok(String::from_utf8(bytes.to_vec())?),
        FileType::Html => extract_html(bytes),
        FileType::Pdf => extract_pdf(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_html(bytes: &[u8]) -> Result<String, ExtractError> {
    let text = html2text::from_read(bytes, HTML_WRAP_WIDTH)
        .map_err(|e| ExtractError::Html(e.to_string()))?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text("héllo\nworld".as_bytes(), FileType::Text).unwrap();
        assert_eq!(text, "héllo\nworld");
    }

    #[test]
    fn invalid_utf8_returns_error() {
        let err = extract_text(&[0xff, 0xfe, 0xfd], FileType::Markdown).unwrap_err();
        assert!(matches!(err, ExtractError::Utf8(_)));
    }

    #[test]
    fn html_tags_are_stripped() {
        let html = b"<html><body><h1>Policy</h1><p>All data is encrypted.</p></body></html>";
        let text = extract_text(html, FileType::Html).unwrap();
        assert!(text.contains("Policy"));
        assert!(text.contains("All data is encrypted."));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", FileType::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
