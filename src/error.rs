use crate::llm::ProviderKind;
use thiserror::Error;

/// Errors produced by the question-answering pipeline
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or inconsistent configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A document could not be loaded
    #[error("document error: {0}")]
    Document(String),

    /// The embedding backend failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The vector store could not be reached or rejected the request
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// A language model provider failed (bad key, quota, network)
    #[error("{provider} request failed: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    /// The requested provider has no configured client
    #[error("provider {0} is not configured")]
    ProviderUnavailable(ProviderKind),

    /// The caller sent something we cannot act on
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
