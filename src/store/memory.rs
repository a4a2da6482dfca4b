//! In-memory [`Store`] implementation for tests and batch runs.
//!
//! Documents and query records live in `Vec`s behind `std::sync::RwLock`,
//! so insertion order doubles as upload order.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Chunk, Document, QueryRecord};

use super::Store;

/// In-memory store for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
    queries: RwLock<Vec<QueryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let mut docs = write(&self.docs)?;
        if docs.iter().any(|d| d.id == doc.id) {
            bail!("document already exists: {}", doc.id);
        }
        let mut stored = doc.clone();
        stored.chunks = None;
        stored.processed_at = None;
        docs.push(stored);
        Ok(())
    }

    async fn get_document(&self, user_id: &str, id: &str) -> Result<Option<Document>> {
        let docs = read(&self.docs)?;
        Ok(docs
            .iter()
            .find(|d| d.id == id && d.user_id == user_id)
            .cloned())
    }

    async fn list_documents_for_user(&self, user_id: &str) -> Result<Vec<Document>> {
        let docs = read(&self.docs)?;
        Ok(docs.iter().filter(|d| d.user_id == user_id).cloned().collect())
    }

    async fn delete_document(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut docs = write(&self.docs)?;
        let before = docs.len();
        docs.retain(|d| !(d.id == id && d.user_id == user_id));
        Ok(docs.len() < before)
    }

    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut docs = write(&self.docs)?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| anyhow!("document not found: {}", document_id))?;
        doc.chunks = Some(chunks.to_vec());
        doc.processed_at = Some(processed_at);
        Ok(())
    }

    async fn insert_query(&self, record: &QueryRecord) -> Result<()> {
        write(&self.queries)?.push(record.clone());
        Ok(())
    }

    async fn list_queries(&self, user_id: &str, limit: usize) -> Result<Vec<QueryRecord>> {
        let queries = read(&self.queries)?;
        Ok(queries
            .iter()
            .rev()
            .filter(|q| q.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
