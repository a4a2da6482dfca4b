//! SQLite-backed [`Store`] implementation.
//!
//! Timestamps are stored as Unix milliseconds. Sources inside a query
//! record are stored as a JSON snapshot, since they are never queried
//! individually.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::migrate;
use crate::models::{Chunk, Document, FileType, QueryRecord, Source};

use super::Store;

const MAX_CONNECTIONS: u32 = 5;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database file, creating it and its directory if
    /// needed, and make sure the schema exists. The pool runs in WAL mode
    /// with foreign keys enforced so chunk rows cascade with their document.
    pub async fn open(config: &Config) -> Result<Self> {
        let path = &config.db.path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating database directory {}", dir.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("opening database {}", path.display()))?;

        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("invalid timestamp: {}", ms))
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let file_type: String = row.get("file_type");
    let processed_at: Option<i64> = row.get("processed_at");
    Ok(Document {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        file_type: FileType::parse(&file_type)?,
        size_bytes: row.get("size_bytes"),
        storage_path: row.get("storage_path"),
        content_hash: row.get("content_hash"),
        created_at: from_millis(row.get("created_at"))?,
        processed_at: processed_at.map(from_millis).transpose()?,
        chunks: None,
    })
}

fn chunk_from_row(row: &SqliteRow) -> Chunk {
    let start: i64 = row.get("start_offset");
    let end: i64 = row.get("end_offset");
    Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        index: row.get("chunk_index"),
        content: row.get("content"),
        start: start as usize,
        end: end as usize,
    }
}

const DOCUMENT_COLUMNS: &str = "id, user_id, title, content, file_type, size_bytes, \
     storage_path, content_hash, created_at, processed_at";

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, title, content, file_type, size_bytes,
                                   storage_path, content_hash, created_at, processed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.user_id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(doc.file_type.as_str())
        .bind(doc.size_bytes)
        .bind(&doc.storage_path)
        .bind(&doc.content_hash)
        .bind(doc.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(&self, user_id: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ? AND user_id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let mut doc = match row {
            Some(row) => document_from_row(&row)?,
            None => return Ok(None),
        };

        if doc.processed_at.is_some() {
            let rows = sqlx::query(
                "SELECT id, document_id, chunk_index, content, start_offset, end_offset \
                 FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
            doc.chunks = Some(rows.iter().map(chunk_from_row).collect());
        }

        Ok(Some(doc))
    }

    async fn list_documents_for_user(&self, user_id: &str) -> Result<Vec<Document>> {
        let doc_rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
            DOCUMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let chunk_rows = sqlx::query(
            r#"
            SELECT c.id, c.document_id, c.chunk_index, c.content, c.start_offset, c.end_offset
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE d.user_id = ?
            ORDER BY c.document_id, c.chunk_index ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_doc: HashMap<String, Vec<Chunk>> = HashMap::new();
        for row in &chunk_rows {
            let chunk = chunk_from_row(row);
            by_doc
                .entry(chunk.document_id.clone())
                .or_default()
                .push(chunk);
        }

        doc_rows
            .iter()
            .map(|row| {
                let mut doc = document_from_row(row)?;
                if doc.processed_at.is_some() {
                    doc.chunks = Some(by_doc.remove(&doc.id).unwrap_or_default());
                }
                Ok(doc)
            })
            .collect()
    }

    async fn delete_document(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM chunks WHERE document_id IN \
             (SELECT id FROM documents WHERE id = ? AND user_id = ?)",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM documents WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE documents SET processed_at = ? WHERE id = ?")
            .bind(processed_at.timestamp_millis())
            .bind(document_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            bail!("document not found: {}", document_id);
        }

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, content, start_offset, end_offset) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(document_id)
            .bind(chunk.index)
            .bind(&chunk.content)
            .bind(chunk.start as i64)
            .bind(chunk.end as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_query(&self, record: &QueryRecord) -> Result<()> {
        let sources_json = serde_json::to_string(&record.sources)?;
        sqlx::query(
            r#"
            INSERT INTO queries (id, user_id, query, answer, sources_json, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.query)
        .bind(&record.answer)
        .bind(&sources_json)
        .bind(record.duration_ms)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_queries(&self, user_id: &str, limit: usize) -> Result<Vec<QueryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, query, answer, sources_json, duration_ms, created_at
            FROM queries
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let sources_json: String = row.get("sources_json");
                let sources: Vec<Source> = serde_json::from_str(&sources_json)?;
                Ok(QueryRecord {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    query: row.get("query"),
                    answer: row.get("answer"),
                    sources,
                    duration_ms: row.get("duration_ms"),
                    created_at: from_millis(row.get("created_at"))?,
                })
            })
            .collect()
    }
}
