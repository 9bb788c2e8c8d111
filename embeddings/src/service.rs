use crate::Embedder;
use crate::LocalModelConfig;
use crate::error::EmbeddingError;
use crate::error::Result;
use crate::validate_vector;
use async_trait::async_trait;
use fastembed::InitOptions;
use fastembed::TextEmbedding;
use log::debug;
use log::info;
use std::sync::Arc;

/// Local embedding provider backed by a fastembed ONNX model.
pub struct EmbeddingService {
    model: Arc<TextEmbedding>,
    config: LocalModelConfig,
    name: String,
}

impl EmbeddingService {
    /// Create a new embedding service with default configuration
    pub async fn new() -> Result<Self> {
        Self::with_config(LocalModelConfig::default()).await
    }

    /// Create a new embedding service with custom configuration
    pub async fn with_config(config: LocalModelConfig) -> Result<Self> {
        info!(
            "Initializing embedding service with model {}, dimension {}",
            config.model.label(),
            config.dimension
        );

        let init_options = InitOptions::new(config.model.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);

        // Model download and ONNX session setup block.
        let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .map_err(|e| EmbeddingError::ModelInitialization(e.to_string()))?
            .map_err(|e| {
                EmbeddingError::ModelInitialization(format!("Failed to initialize model: {e}"))
            })?;

        info!("Embedding service initialized successfully");

        Ok(Self {
            model: Arc::new(model),
            name: format!("fastembed/{}", config.model.label()),
            config,
        })
    }

    /// Generate embeddings for a list of texts, in input order.
    pub fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        embed_blocking(&self.model, &self.config, texts)
    }

    pub fn config(&self) -> &LocalModelConfig {
        &self.config
    }
}

fn embed_blocking(
    model: &TextEmbedding,
    config: &LocalModelConfig,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    debug!("Generating embeddings for {} texts", texts.len());

    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in text_refs.chunks(config.batch_size.max(1)) {
        let batch_embeddings = model.embed(chunk.to_vec(), None)?;
        for mut embedding in batch_embeddings {
            if embedding.len() > config.dimension {
                embedding.truncate(config.dimension);
            }
            all_embeddings.push(validate_vector(embedding, config.dimension)?);
        }
    }

    debug!("Generated {} embeddings", all_embeddings.len());
    Ok(all_embeddings)
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let model = Arc::clone(&self.model);
        let config = self.config.clone();
        let text = text.to_string();
        let mut embeddings =
            tokio::task::spawn_blocking(move || embed_blocking(&model, &config, vec![text]))
                .await
                .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))??;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}
