//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunks, sources, and query records
//! that flow through the ingestion and question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::QaError;

/// Declared type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Markdown,
    Html,
    Pdf,
}

impl FileType {
    /// Parse a declared type: a MIME type (`application/pdf`), a short
    /// name (`pdf`), or a file extension with or without the leading dot.
    pub fn parse(declared: &str) -> Result<Self, QaError> {
        let lowered = declared.trim().to_ascii_lowercase();
        let key = lowered
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_start_matches('.');
        match key {
            "text" | "txt" | "text/plain" => Ok(Self::Text),
            "markdown" | "md" | "text/markdown" => Ok(Self::Markdown),
            "html" | "htm" | "text/html" => Ok(Self::Html),
            "pdf" | "application/pdf" => Ok(Self::Pdf),
            _ => Err(QaError::InvalidInput(format!(
                "unsupported file type: '{}'",
                declared
            ))),
        }
    }

    /// Infer the type from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, QaError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                QaError::InvalidInput(format!("no file extension: {}", path.display()))
            })?;
        Self::parse(ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw upload as delivered by a transport (CLI file read, HTTP body).
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub file_type: FileType,
    pub bytes: Vec<u8>,
    pub storage_path: Option<String>,
}

/// A document owned by a single user.
///
/// `chunks` is `None` until the document has been processed; a processed
/// document with empty text carries `Some(vec![])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub file_type: FileType,
    pub size_bytes: i64,
    pub storage_path: Option<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
}

impl Document {
    /// True when the document has at least one chunk to retrieve from.
    pub fn has_chunks(&self) -> bool {
        self.chunks.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.as_ref().map_or(0, Vec::len)
    }
}

/// A contiguous window of a document's content.
///
/// `start` and `end` are character offsets into [`Document::content`],
/// 0-based and end-exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub index: i64,
    pub content: String,
    pub start: usize,
    pub end: usize,
}

/// A scored reference to one chunk, attributed to its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub document_id: String,
    pub document_title: String,
    pub chunk_id: String,
    pub content: String,
    pub start: usize,
    pub end: usize,
    /// Lexical-overlap score in `[0, 1]`.
    pub confidence: f64,
}

/// One answered question, recorded for history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub user_id: String,
    pub query: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_mime_names_and_extensions() {
        assert_eq!(FileType::parse("application/pdf").unwrap(), FileType::Pdf);
        assert_eq!(FileType::parse(".md").unwrap(), FileType::Markdown);
        assert_eq!(
            FileType::parse("text/html; charset=utf-8").unwrap(),
            FileType::Html
        );
        assert_eq!(FileType::parse("TXT").unwrap(), FileType::Text);
    }

    #[test]
    fn parse_rejects_unknown_types() {
        let err = FileType::parse("application/zip").unwrap_err();
        assert!(matches!(err, QaError::InvalidInput(_)));
    }

    #[test]
    fn from_path_uses_extension() {
        assert_eq!(
            FileType::from_path(Path::new("docs/policy.htm")).unwrap(),
            FileType::Html
        );
        assert!(FileType::from_path(Path::new("README")).is_err());
    }
}
