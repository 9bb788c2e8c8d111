use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    /// Failed to generate embeddings
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    /// Invalid input provided to embedding service
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No API key in config or environment
    #[error("Missing API key: set `api_key` or {0}")]
    MissingApiKey(String),

    /// Transport-level failure talking to a remote provider
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// Remote provider answered with a non-success status
    #[error("Embedding provider returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Provider returned an empty vector
    #[error("Provider returned an empty embedding")]
    EmptyEmbedding,

    /// Provider returned a vector of the wrong length
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Call exceeded the configured request timeout
    #[error("Embedding request timed out after {0} ms")]
    Timeout(u128),
}

impl From<fastembed::Error> for EmbeddingError {
    fn from(err: fastembed::Error) -> Self {
        EmbeddingError::EmbeddingGeneration(err.to_string())
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Request(err.to_string())
    }
}

/// Result type for embedding operations
pub type Result<T> = std::result::Result<T, EmbeddingError>;
