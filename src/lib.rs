//! # docqa
//!
//! Question answering over a user's uploaded documents.
//!
//! Documents (plain text, Markdown, HTML, PDF) are reduced to text, split
//! into overlapping fixed-size character windows, and stored per user.
//! A question is answered by ranking every chunk of the caller's documents
//! with a word-overlap score, keeping the best few above a threshold, and
//! handing them to a text generator as numbered sources.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │  Upload  │──▶│ Extract+Chunk │──▶│  Store   │
//! │ CLI/HTTP │   │               │   │ SQLite   │
//! └──────────┘   └───────────────┘   └────┬─────┘
//!                                         │
//!                  ┌──────────────────────┤
//!                  ▼                      ▼
//!            ┌──────────┐  sources  ┌───────────┐
//!            │ Retrieve │──────────▶│ Generator │
//!            └──────────┘           └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa init
//! docqa upload ./docs --user alice
//! docqa sources "data retention" --user alice
//! docqa ask "How long is data retained?" --user alice
//! docqa serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Domain error taxonomy |
//! | [`models`] | Documents, chunks, sources, query records |
//! | [`extract`] | Bytes to text per file type |
//! | [`chunk`] | Overlapping character-window chunking |
//! | [`retrieve`] | Word-overlap scoring and top-K selection |
//! | [`llm`] | Text generator trait, prompts, OpenAI client |
//! | [`store`] | Storage trait with SQLite and in-memory backends |
//! | [`ingest`] | Upload and processing pipeline |
//! | [`qa`] | Question answering and history |
//! | [`documents`] | Document CLI commands |
//! | [`server`] | HTTP API |
//! | [`migrate`] | Schema creation |

pub mod chunk;
pub mod config;
pub mod documents;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod qa;
pub mod retrieve;
pub mod server;
pub mod store;
