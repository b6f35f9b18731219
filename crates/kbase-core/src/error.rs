use thiserror::Error;

/// Failures surfaced to callers. Degraded-but-successful paths (a single
/// missing retriever, a poisoned reranker, a generation timeout) are not
/// errors and never appear here.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input, user-correctable.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to load document: {0}")]
    LoadFailed(String),

    #[error("retrieval backend unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Total failure of the answering pipeline; partial degradation never
    /// produces this.
    #[error("failed to answer question: {0}")]
    AnswerFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
