//! Question answering over a user's documents.
//!
//! [`answer_query`] runs the full pipeline for one question:
//!
//! 1. Reject an empty query.
//! 2. Load the caller's documents; fail with [`QaError::EmptyCorpus`]
//!    when none of them has chunks.
//! 3. Rank chunks with [`retrieve`].
//! 4. Prompt the [`TextGenerator`] with the numbered sources.
//! 5. Record query, answer, sources, and timing in a single insert.
//!
//! A generator failure surfaces as [`QaError::Upstream`] and nothing is
//! recorded.

use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::chunk::chunk_with_config;
use crate::config::{ChunkingConfig, Config, HistoryConfig, RetrievalConfig};
use crate::error::{QaError, Result};
use crate::llm::{self, build_user_prompt, TextGenerator, SYSTEM_PROMPT};
use crate::models::{Document, FileType, QueryRecord, Source};
use crate::retrieve::retrieve;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

fn validate(user_id: &str, query: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(QaError::InvalidInput("user id must not be empty".to_string()));
    }
    if query.trim().is_empty() {
        return Err(QaError::InvalidInput("query must not be empty".to_string()));
    }
    Ok(())
}

/// Rank the caller's chunks against `query` without generating an answer.
pub async fn find_sources(
    store: &dyn Store,
    user_id: &str,
    query: &str,
    params: &RetrievalConfig,
) -> Result<Vec<Source>> {
    validate(user_id, query)?;

    let documents = store.list_documents_for_user(user_id).await?;
    if !documents.iter().any(Document::has_chunks) {
        return Err(QaError::EmptyCorpus);
    }

    let sources = retrieve(query, &documents, params);
    tracing::debug!(
        user_id,
        documents = documents.len(),
        sources = sources.len(),
        "retrieval complete"
    );
    Ok(sources)
}

/// Answer `query` from the caller's documents and record it in history.
pub async fn answer_query(
    store: &dyn Store,
    generator: &dyn TextGenerator,
    user_id: &str,
    query: &str,
    params: &RetrievalConfig,
) -> Result<QueryRecord> {
    let started = Instant::now();
    let sources = find_sources(store, user_id, query, params).await?;

    let answer = generator
        .generate(SYSTEM_PROMPT, &build_user_prompt(query, &sources))
        .await
        .map_err(|e| {
            tracing::warn!(user_id, model = generator.model_name(), error = %e, "generation failed");
            QaError::Upstream(e)
        })?;

    let record = QueryRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        query: query.trim().to_string(),
        answer,
        sources,
        duration_ms: started.elapsed().as_millis() as i64,
        created_at: Utc::now(),
    };
    store.insert_query(&record).await?;

    tracing::info!(
        user_id,
        query_id = %record.id,
        sources = record.sources.len(),
        duration_ms = record.duration_ms,
        "query answered"
    );
    Ok(record)
}

/// Most recent query records of the caller, newest first, never more
/// than `[history] limit`.
pub async fn history(
    store: &dyn Store,
    user_id: &str,
    requested: Option<usize>,
    config: &HistoryConfig,
) -> Result<Vec<QueryRecord>> {
    let limit = config.effective_limit(requested);
    Ok(store.list_queries(user_id, limit).await?)
}

/// Answer each question against a single ad-hoc text, in order.
///
/// The text is chunked in memory and nothing is persisted. Any failing
/// question fails the whole batch.
pub async fn answer_batch(
    generator: &dyn TextGenerator,
    text: &str,
    questions: &[String],
    chunking: &ChunkingConfig,
    params: &RetrievalConfig,
) -> Result<Vec<String>> {
    let id = Uuid::new_v4().to_string();
    let chunks = chunk_with_config(&id, text, chunking)?;
    if chunks.is_empty() {
        return Err(QaError::EmptyCorpus);
    }

    let doc = Document {
        id,
        user_id: String::new(),
        title: "Document".to_string(),
        content: text.to_string(),
        file_type: FileType::Text,
        size_bytes: text.len() as i64,
        storage_path: None,
        content_hash: String::new(),
        created_at: Utc::now(),
        processed_at: Some(Utc::now()),
        chunks: Some(chunks),
    };
    let documents = [doc];

    let mut answers = Vec::with_capacity(questions.len());
    for question in questions {
        if question.trim().is_empty() {
            return Err(QaError::InvalidInput("question must not be empty".to_string()));
        }
        let sources = retrieve(question, &documents, params);
        let answer = generator
            .generate(SYSTEM_PROMPT, &build_user_prompt(question, &sources))
            .await
            .map_err(QaError::Upstream)?;
        answers.push(answer);
    }
    Ok(answers)
}

fn print_sources(sources: &[Source]) {
    for (i, s) in sources.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} (chars {}..{})",
            i + 1,
            s.confidence,
            s.document_title,
            s.start,
            s.end
        );
        let excerpt: String = s.content.chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!("    document: {}", s.document_id);
    }
}

/// CLI entry point for `docqa sources`.
pub async fn run_sources(config: &Config, user_id: &str, query: &str) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let sources = find_sources(&store, user_id, query, &config.retrieval).await?;

    if sources.is_empty() {
        println!("No results.");
    } else {
        print_sources(&sources);
    }

    store.close().await;
    Ok(())
}

/// CLI entry point for `docqa ask`.
pub async fn run_ask(config: &Config, user_id: &str, query: &str) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let generator = llm::create_generator(&config.llm)?;
    let record = answer_query(
        &store,
        generator.as_ref(),
        user_id,
        query,
        &config.retrieval,
    )
    .await?;

    println!("{}", record.answer);
    println!();
    println!("--- Sources ({}) ---", record.sources.len());
    print_sources(&record.sources);
    println!();
    println!("({} ms)", record.duration_ms);

    store.close().await;
    Ok(())
}

/// CLI entry point for `docqa history`.
pub async fn run_history(config: &Config, user_id: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let records = history(&store, user_id, limit, &config.history).await?;

    if records.is_empty() {
        println!("No queries yet.");
    }
    for record in &records {
        println!(
            "{}  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.query
        );
        println!("    answer: {}", record.answer.replace('\n', " "));
        println!(
            "    sources: {}  ({} ms)",
            record.sources.len(),
            record.duration_ms
        );
    }

    store.close().await;
    Ok(())
}
