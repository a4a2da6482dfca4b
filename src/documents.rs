//! Document listing, inspection, and deletion from the CLI.
//!
//! Backs `docqa list`, `docqa get`, and `docqa delete`. The HTTP server
//! goes through the [`Store`](crate::store::Store) trait directly.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::QaError;
use crate::ingest;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// CLI entry point for `docqa list`.
pub async fn run_list(config: &Config, user_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let docs = store.list_documents_for_user(user_id).await?;

    if docs.is_empty() {
        println!("No documents.");
    } else {
        println!(
            "{:<36}  {:<8}  {:>10}  {:>6}  {:<9}  TITLE",
            "ID", "TYPE", "BYTES", "CHUNKS", "PROCESSED"
        );
        for doc in &docs {
            println!(
                "{:<36}  {:<8}  {:>10}  {:>6}  {:<9}  {}",
                doc.id,
                doc.file_type,
                doc.size_bytes,
                doc.chunk_count(),
                if doc.processed_at.is_some() { "yes" } else { "no" },
                doc.title
            );
        }
    }

    store.close().await;
    Ok(())
}

/// CLI entry point for `docqa get`.
pub async fn run_get(config: &Config, user_id: &str, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let doc = store
        .get_document(user_id, id)
        .await?
        .ok_or_else(|| QaError::NotFound(id.to_string()))?;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("title:        {}", doc.title);
    println!("file_type:    {}", doc.file_type);
    println!("size_bytes:   {}", doc.size_bytes);
    if let Some(ref path) = doc.storage_path {
        println!("storage_path: {}", path);
    }
    println!("content_hash: {}", doc.content_hash);
    println!("created_at:   {}", format_ts(doc.created_at));
    match doc.processed_at {
        Some(ts) => println!("processed_at: {}", format_ts(ts)),
        None => println!("processed_at: (not processed)"),
    }
    println!();

    let chunks = doc.chunks.unwrap_or_default();
    println!("--- Chunks ({}) ---", chunks.len());
    for chunk in &chunks {
        println!("[chunk {}] chars {}..{}", chunk.index, chunk.start, chunk.end);
        println!("{}", chunk.content);
        println!();
    }

    store.close().await;
    Ok(())
}

/// CLI entry point for `docqa delete`.
pub async fn run_delete(config: &Config, user_id: &str, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    ingest::delete_document(&store, user_id, id).await?;
    println!("deleted {}", id);
    store.close().await;
    Ok(())
}
