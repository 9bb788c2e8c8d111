use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Indexer error: {0}")]
    Indexer(#[from] codescope_codebase_indexer::IndexerError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] codescope_embeddings::EmbeddingError),

    #[error("Invalid context configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
