//! Error taxonomy for the question-answering pipeline.
//!
//! Application plumbing (CLI, config loading, migrations) uses
//! `anyhow::Result`. Operations a caller may need to branch on return
//! [`QaError`], which the HTTP layer maps onto status codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    /// Rejected before any computation: bad chunking parameters, empty
    /// query, unsupported or undecodable upload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The document does not exist or belongs to another user.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The text-generation service failed or timed out.
    #[error("text generation failed: {0}")]
    Upstream(#[source] anyhow::Error),

    /// The user has no processed documents to retrieve from.
    #[error("no documents available, upload documents first")]
    EmptyCorpus,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for QaError {
    fn from(err: sqlx::Error) -> Self {
        QaError::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
