//! # Codescope Embeddings
//!
//! Text embeddings for semantic code search.
//!
//! The [`Embedder`] trait is the narrow capability the indexer depends on.
//! Two providers ship with the crate:
//!
//! - [`EmbeddingService`]: a local ONNX model via fastembed-rs
//!   (Nomic-embed-text-v1.5 by default).
//! - [`OpenAiEmbedder`]: any OpenAI-compatible `/embeddings` endpoint.
//!
//! [`EmbeddingManager`] wraps a provider with truncation and timeouts and
//! turns failures into `None`.
//!
//! ## Example
//!
//! ```no_run
//! use codescope_embeddings::{EmbeddingConfig, EmbeddingManager, build_embedder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EmbeddingConfig::default();
//!     let manager = EmbeddingManager::new(build_embedder(&config).await?, &config);
//!     let vector = manager.embed_query("parse configuration file").await;
//!     println!("embedded: {}", vector.is_some());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod manager;
mod openai;
mod service;

pub use config::EmbeddingConfig;
pub use config::EmbeddingModelType;
pub use config::LocalModelConfig;
pub use config::OpenAiConfig;
pub use config::ProviderKind;
pub use error::EmbeddingError;
pub use error::Result;
pub use manager::EmbeddingManager;
pub use manager::truncate_chars;
pub use openai::OPENAI_API_KEY_ENV;
pub use openai::OpenAiEmbedder;
pub use service::EmbeddingService;

use async_trait::async_trait;
use std::sync::Arc;

/// Default embedding dimension for Nomic-embed-text-v1.5
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Compact embedding dimension (using Matryoshka truncation)
pub const COMPACT_EMBEDDING_DIM: usize = 256;

/// Dimension of `text-embedding-3-small`
pub const OPENAI_EMBEDDING_DIM: usize = 1536;

/// A provider that turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Short provider label for logs.
    fn name(&self) -> &str;
}

/// Construct the provider selected by `config`.
pub async fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    config.validate().map_err(EmbeddingError::InvalidInput)?;
    let embedder: Arc<dyn Embedder> = match config.provider {
        ProviderKind::Local => Arc::new(EmbeddingService::with_config(config.local.clone()).await?),
        ProviderKind::OpenAi => Arc::new(OpenAiEmbedder::new(config.openai.clone())?),
    };
    Ok(embedder)
}

/// Rejects empty vectors and vectors of the wrong length.
pub(crate) fn validate_vector(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(EmbeddingError::EmptyEmbedding);
    }
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector)
}
