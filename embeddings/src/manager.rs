use crate::Embedder;
use crate::EmbeddingConfig;
use crate::error::EmbeddingError;
use crate::error::Result;
use log::debug;
use log::warn;
use std::sync::Arc;
use std::time::Duration;

/// Best-effort front for an [`Embedder`].
///
/// Every call is time-boxed. Failures and timeouts are logged and turned
/// into `None`, so indexing and retrieval degrade instead of aborting.
#[derive(Clone)]
pub struct EmbeddingManager {
    embedder: Arc<dyn Embedder>,
    max_symbol_chars: usize,
    request_timeout: Duration,
}

impl EmbeddingManager {
    pub fn new(embedder: Arc<dyn Embedder>, config: &EmbeddingConfig) -> Self {
        Self {
            embedder,
            max_symbol_chars: config.max_symbol_chars,
            request_timeout: config.request_timeout(),
        }
    }

    pub fn with_limits(
        embedder: Arc<dyn Embedder>,
        max_symbol_chars: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            max_symbol_chars,
            request_timeout,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn provider_name(&self) -> &str {
        self.embedder.name()
    }

    /// Embeds a symbol's source text, truncated to `max_symbol_chars`.
    pub async fn embed_symbol(&self, text: &str) -> Option<Vec<f32>> {
        let text = truncate_chars(text, self.max_symbol_chars);
        self.embed_logged("symbol", text).await
    }

    /// Embeds a whole file's content.
    pub async fn embed_file(&self, content: &str) -> Option<Vec<f32>> {
        self.embed_logged("file", content).await
    }

    pub async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        self.embed_logged("query", query).await
    }

    /// Time-boxed call that surfaces the error instead of swallowing it.
    pub async fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        match tokio::time::timeout(self.request_timeout, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout(self.request_timeout.as_millis())),
        }
    }

    async fn embed_logged(&self, what: &str, text: &str) -> Option<Vec<f32>> {
        if text.trim().is_empty() {
            debug!("Skipping embedding for empty {what} text");
            return None;
        }
        match self.try_embed(text).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(
                    "Failed to embed {what} with {}: {err}",
                    self.embedder.name()
                );
                None
            }
        }
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
