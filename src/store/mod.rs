//! Storage abstraction for docqa.
//!
//! The [`Store`] trait defines every persistence operation the ingestion
//! and question-answering pipeline needs, so the core never touches SQL
//! directly. Two backends ship with the crate:
//!
//! - [`memory::InMemoryStore`] for tests and ephemeral batch runs.
//! - [`sqlite::SqliteStore`] for the CLI and HTTP server.
//!
//! Every read and delete is scoped by the caller's `user_id`; a document
//! owned by someone else is indistinguishable from a missing one.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Chunk, Document, QueryRecord};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](Store::insert_document) | Record a freshly uploaded document |
/// | [`get_document`](Store::get_document) | Fetch one owned document with its chunks |
/// | [`list_documents_for_user`](Store::list_documents_for_user) | All owned documents with chunks, upload order |
/// | [`delete_document`](Store::delete_document) | Remove an owned document and its chunks |
/// | [`replace_chunks`](Store::replace_chunks) | Atomically swap a document's chunk set |
/// | [`insert_query`](Store::insert_query) | Record one answered question |
/// | [`list_queries`](Store::list_queries) | History, most recent first |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new document. Its `chunks` field is ignored; chunks are
    /// attached later through [`replace_chunks`](Store::replace_chunks).
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    /// Fetch a document with its chunks if it exists and belongs to `user_id`.
    async fn get_document(&self, user_id: &str, id: &str) -> Result<Option<Document>>;

    /// All documents owned by `user_id`, oldest upload first, chunks attached.
    async fn list_documents_for_user(&self, user_id: &str) -> Result<Vec<Document>>;

    /// Delete a document and its chunks. Returns `false` when no document
    /// with this id is owned by `user_id`.
    async fn delete_document(&self, user_id: &str, id: &str) -> Result<bool>;

    /// Replace every chunk of `document_id` and stamp `processed_at`.
    ///
    /// Either the whole new set becomes visible or none of it does.
    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        processed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Persist a completed query record.
    async fn insert_query(&self, record: &QueryRecord) -> Result<()>;

    /// The `limit` most recent query records of `user_id`, newest first.
    async fn list_queries(&self, user_id: &str, limit: usize) -> Result<Vec<QueryRecord>>;
}
