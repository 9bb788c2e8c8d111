use thiserror::Error;

/// Errors that can occur during similarity computations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorStoreError {
    /// Vectors of different length cannot be compared
    #[error("Dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Result type for vector store operations
pub type Result<T> = std::result::Result<T, VectorStoreError>;
