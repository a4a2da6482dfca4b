//! Ingestion pipeline orchestration.
//!
//! Coordinates the upload flow: raw bytes → text extraction → document
//! record → chunking → chunk replacement. The document row is written
//! before chunking starts, so a failed chunking pass leaves an
//! unprocessed document that can be retried with [`process_document`].

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunk::chunk_with_config;
use crate::config::{ChunkingConfig, Config};
use crate::error::{QaError, Result};
use crate::extract::extract_text;
use crate::models::{Document, FileType, NewDocument};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

fn require_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(QaError::InvalidInput("user id must not be empty".to_string()));
    }
    Ok(())
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validate an upload, extract its text, and record it as an unprocessed
/// document owned by `user_id`.
pub async fn upload_document(
    store: &dyn Store,
    user_id: &str,
    upload: NewDocument,
) -> Result<Document> {
    require_user(user_id)?;
    let title = upload.title.trim();
    if title.is_empty() {
        return Err(QaError::InvalidInput("title must not be empty".to_string()));
    }

    let content = extract_text(&upload.bytes, upload.file_type)
        .map_err(|e| QaError::InvalidInput(e.to_string()))?;

    let doc = Document {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        content_hash: content_hash(&content),
        content,
        file_type: upload.file_type,
        size_bytes: upload.bytes.len() as i64,
        storage_path: upload.storage_path,
        created_at: Utc::now(),
        processed_at: None,
        chunks: None,
    };
    store.insert_document(&doc).await?;

    tracing::info!(
        document_id = %doc.id,
        user_id,
        file_type = %doc.file_type,
        size_bytes = doc.size_bytes,
        "document uploaded"
    );
    Ok(doc)
}

/// Chunk an owned document and atomically replace its chunk set.
pub async fn process_document(
    store: &dyn Store,
    user_id: &str,
    document_id: &str,
    chunking: &ChunkingConfig,
) -> Result<Document> {
    let mut doc = store
        .get_document(user_id, document_id)
        .await?
        .ok_or_else(|| QaError::NotFound(document_id.to_string()))?;

    let chunks = chunk_with_config(&doc.id, &doc.content, chunking)?;
    let processed_at = Utc::now();
    store.replace_chunks(&doc.id, &chunks, processed_at).await?;

    tracing::info!(document_id, chunks = chunks.len(), "document processed");
    doc.chunks = Some(chunks);
    doc.processed_at = Some(processed_at);
    Ok(doc)
}

/// Upload and immediately process.
pub async fn ingest_document(
    store: &dyn Store,
    user_id: &str,
    upload: NewDocument,
    chunking: &ChunkingConfig,
) -> Result<Document> {
    let doc = upload_document(store, user_id, upload).await?;
    process_document(store, user_id, &doc.id, chunking).await
}

/// Delete an owned document and its chunks.
pub async fn delete_document(store: &dyn Store, user_id: &str, document_id: &str) -> Result<()> {
    if store.delete_document(user_id, document_id).await? {
        tracing::info!(document_id, user_id, "document deleted");
        Ok(())
    } else {
        Err(QaError::NotFound(document_id.to_string()))
    }
}

/// Expand `paths` into uploadable files: files as given, directories
/// walked recursively for files with a supported extension.
pub fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| FileType::from_path(p).is_ok())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            anyhow::bail!("no such file or directory: {}", path.display());
        }
    }
    Ok(files)
}

/// Read a file from disk into an upload. The title defaults to the file
/// stem and the type to the extension.
pub fn read_upload(
    path: &Path,
    title: Option<&str>,
    file_type: Option<&str>,
) -> anyhow::Result<NewDocument> {
    let file_type = match file_type {
        Some(declared) => FileType::parse(declared)?,
        None => FileType::from_path(path)?,
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let title = title
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| path.display().to_string());

    Ok(NewDocument {
        title,
        file_type,
        bytes,
        storage_path: Some(path.display().to_string()),
    })
}

/// CLI entry point for `docqa upload`.
pub async fn run_upload(
    config: &Config,
    user_id: &str,
    paths: &[PathBuf],
    title: Option<String>,
    file_type: Option<String>,
) -> anyhow::Result<()> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        println!("No supported files found.");
        return Ok(());
    }
    if title.is_some() && files.len() > 1 {
        anyhow::bail!("--title can only be used with a single file");
    }

    let store = SqliteStore::open(config).await?;
    let mut uploaded = 0u64;
    let mut chunks_written = 0u64;

    for path in &files {
        let upload = read_upload(path, title.as_deref(), file_type.as_deref())?;
        let doc = ingest_document(&store, user_id, upload, &config.chunking)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;

        println!("{}  {}  ({} chunks)", doc.id, doc.title, doc.chunk_count());
        uploaded += 1;
        chunks_written += doc.chunk_count() as u64;
    }

    println!("upload");
    println!("  documents: {}", uploaded);
    println!("  chunks written: {}", chunks_written);
    println!("ok");

    store.close().await;
    Ok(())
}

/// CLI entry point for `docqa process`.
pub async fn run_process(config: &Config, user_id: &str, document_id: &str) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let doc = process_document(&store, user_id, document_id, &config.chunking).await?;
    println!("processed {}: {} chunks", doc.id, doc.chunk_count());
    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn text_upload(title: &str, text: &str) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            file_type: FileType::Text,
            bytes: text.as_bytes().to_vec(),
            storage_path: None,
        }
    }

    #[tokio::test]
    async fn upload_records_unprocessed_document() {
        let store = InMemoryStore::new();
        let doc = upload_document(&store, "alice", text_upload(" Notes ", "hello world"))
            .await
            .unwrap();

        assert_eq!(doc.title, "Notes");
        assert_eq!(doc.size_bytes, 11);
        assert_eq!(doc.content_hash.len(), 64);

        let stored = store.get_document("alice", &doc.id).await.unwrap().unwrap();
        assert!(stored.chunks.is_none());
        assert!(stored.processed_at.is_none());
    }

    #[tokio::test]
    async fn ingest_chunks_with_configured_window() {
        let store = InMemoryStore::new();
        let text = "x".repeat(2500);
        let doc = ingest_document(
            &store,
            "alice",
            text_upload("Long", &text),
            &ChunkingConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(doc.chunk_count(), 3);
        let stored = store.get_document("alice", &doc.id).await.unwrap().unwrap();
        assert_eq!(stored.chunks.unwrap().last().unwrap().end, 2500);
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let store = InMemoryStore::new();
        let err = upload_document(&store, "alice", text_upload("  ", "body"))
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn undecodable_upload_is_rejected() {
        let store = InMemoryStore::new();
        let upload = NewDocument {
            title: "Broken".to_string(),
            file_type: FileType::Pdf,
            bytes: b"not a pdf".to_vec(),
            storage_path: None,
        };
        let err = upload_document(&store, "alice", upload).await.unwrap_err();
        assert!(matches!(err, QaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn processing_another_users_document_is_not_found() {
        let store = InMemoryStore::new();
        let doc = upload_document(&store, "alice", text_upload("Mine", "secret text"))
            .await
            .unwrap();

        let err = process_document(&store, "bob", &doc.id, &ChunkingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));

        let err = delete_document(&store, "bob", &doc.id).await.unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));
    }

    #[test]
    fn collect_files_filters_unsupported_extensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();
        std::fs::write(tmp.path().join("nested/b.txt"), "b").unwrap();
        std::fs::write(tmp.path().join("image.png"), "png").unwrap();

        let files = collect_files(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }
}
