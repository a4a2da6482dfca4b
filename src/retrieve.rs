//! Lexical relevance scoring and top-K source selection.
//!
//! Retrieval is a full scan over the caller's processed chunks. There is
//! no index: every chunk is scored against the query with a word-overlap
//! ratio, chunks at or below the threshold are dropped, and the best
//! `top_k` survivors become [`Source`]s.
//!
//! # Scoring
//!
//! 1. Lowercase both texts and split on whitespace.
//! 2. Trim leading/trailing punctuation from each word for matching.
//! 3. Count query word occurrences longer than `min_word_len` chars that
//!    also appear anywhere in the chunk.
//! 4. Divide by `max(query_tokens, chunk_tokens)`, where both counts are
//!    taken over the raw whitespace split. Punctuation-only tokens such
//!    as list bullets never match but still count.
//!
//! The score is in `[0, 1]` and is 0 when no significant word is shared.
//! It is a bag-of-words heuristic: synonyms, stemming, and word order are
//! ignored.

use std::collections::HashSet;

use crate::config::RetrievalConfig;
use crate::models::{Document, Source};

/// Lowercased, punctuation-trimmed words of `text`, paired with the
/// number of whitespace tokens they came from.
fn words(text: &str) -> (Vec<String>, usize) {
    let mut tokens = 0;
    let words = text
        .split_whitespace()
        .inspect(|_| tokens += 1)
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    (words, tokens)
}

/// A query prepared once and scored against many chunks.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    words: Vec<String>,
    token_count: usize,
    min_word_len: usize,
}

impl QueryTerms {
    pub fn new(query: &str, min_word_len: usize) -> Self {
        let (words, token_count) = words(query);
        Self {
            words,
            token_count,
            min_word_len,
        }
    }

    /// True when the query has at least one word that can ever match.
    pub fn has_significant_words(&self) -> bool {
        self.words
            .iter()
            .any(|w| w.chars().count() > self.min_word_len)
    }

    /// Overlap score of this query against `text`, in `[0, 1]`.
    pub fn score(&self, text: &str) -> f64 {
        let (chunk_words, chunk_tokens) = words(text);
        let denominator = self.token_count.max(chunk_tokens);
        if denominator == 0 {
            return 0.0;
        }

        let chunk_set: HashSet<&str> = chunk_words.iter().map(String::as_str).collect();
        let shared = self
            .words
            .iter()
            .filter(|w| w.chars().count() > self.min_word_len && chunk_set.contains(w.as_str()))
            .count();

        shared as f64 / denominator as f64
    }
}

/// Score `text` against `query`. See the module docs for the formula.
pub fn relevance_score(query: &str, text: &str, min_word_len: usize) -> f64 {
    QueryTerms::new(query, min_word_len).score(text)
}

/// Rank every chunk of every processed document against `query` and
/// return at most `params.top_k` sources, best first.
///
/// Documents without chunks are skipped. Equal scores keep document
/// order, then chunk order.
pub fn retrieve(query: &str, documents: &[Document], params: &RetrievalConfig) -> Vec<Source> {
    let terms = QueryTerms::new(query, params.min_word_len);
    if !terms.has_significant_words() {
        return Vec::new();
    }
    let terms = &terms;

    let mut scored: Vec<Source> = documents
        .iter()
        .filter_map(|doc| doc.chunks.as_ref().map(|chunks| (doc, chunks)))
        .flat_map(move |(doc, chunks)| {
            chunks.iter().filter_map(move |chunk| {
                let score = terms.score(&chunk.content);
                (score > params.min_score).then(|| Source {
                    document_id: doc.id.clone(),
                    document_title: doc.title.clone(),
                    chunk_id: chunk.id.clone(),
                    content: chunk.content.clone(),
                    start: chunk.start,
                    end: chunk.end,
                    confidence: score,
                })
            })
        })
        .collect();

    // Vec::sort_by is stable, which preserves insertion order on ties.
    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(params.top_k);
    scored
}
