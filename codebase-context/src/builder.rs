use crate::config::ContextConfig;
use crate::error::ContextError;
use crate::error::Result;
use crate::format::format_context;
use crate::format::format_result;
use crate::format::truncate_excerpt;
use codescope_codebase_indexer::CodebaseIndexer;
use codescope_codebase_indexer::EntityKey;
use codescope_symbol_extractor::Language;
use log::debug;
use log::info;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One quoted search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    pub path: PathBuf,
    /// Qualified symbol name; `None` for whole-file hits.
    pub symbol: Option<String>,
    pub score: f32,
    pub language: Language,
    pub excerpt: String,
    pub truncated: bool,
}

/// Result of [`ContextBuilder::enhance`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnhancedContext {
    pub query: String,

    /// Text to hand to the model; empty means no relevant context.
    pub context_text: String,

    pub items: Vec<ContextItem>,
}

impl EnhancedContext {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.context_text.is_empty()
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
}

/// Turns free-text queries into a block of quoted code for a
/// text-generation model.
pub struct ContextBuilder {
    config: ContextConfig,
    indexer: CodebaseIndexer,
    /// Query text to query embedding.
    cache: Option<Arc<Mutex<LruCache<String, Vec<f32>>>>>,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig, indexer: CodebaseIndexer) -> Result<Self> {
        config.validate().map_err(ContextError::Configuration)?;
        let cache = NonZeroUsize::new(config.cache_size)
            .map(|capacity| Arc::new(Mutex::new(LruCache::new(capacity))));
        Ok(Self {
            config,
            indexer,
            cache,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Retrieves code relevant to `query` and formats it.
    ///
    /// Yields an empty context, not an error, when retrieval is disabled,
    /// the indexer has no embedding provider, the query cannot be embedded,
    /// or nothing clears the similarity threshold.
    pub async fn enhance(&self, query: &str) -> Result<EnhancedContext> {
        if !self.config.enabled {
            debug!("Context retrieval disabled");
            return Ok(EnhancedContext::empty(query));
        }
        if query.trim().is_empty() {
            return Ok(EnhancedContext::empty(query));
        }

        let Some(query_vector) = self.query_embedding(query).await else {
            return Ok(EnhancedContext::empty(query));
        };

        let hits = self
            .indexer
            .search_similar(&query_vector, self.config.search_options())
            .await;
        debug!("{} results above threshold for '{query}'", hits.len());

        let roots = self.indexer.watch_roots();
        let mut items = Vec::with_capacity(hits.len());
        let mut blocks = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(excerpt) = self.indexer.excerpt(&hit.key).await else {
                debug!("{} vanished before it could be quoted", hit.key.path().display());
                continue;
            };
            let (text, truncated) = truncate_excerpt(&excerpt.text, self.config.max_chunk_chars);
            let label = display_path(&excerpt.path, &roots);
            blocks.push(format_result(&label, hit.score, excerpt.language, &text));
            items.push(ContextItem {
                path: excerpt.path,
                symbol: match hit.key {
                    EntityKey::Symbol { name, .. } => Some(name),
                    EntityKey::File { .. } => None,
                },
                score: hit.score,
                language: excerpt.language,
                excerpt: text,
                truncated,
            });
        }

        if !items.is_empty() {
            info!("Added {} code excerpts to context", items.len());
        }

        Ok(EnhancedContext {
            query: query.to_string(),
            context_text: format_context(&blocks),
            items,
        })
    }

    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().await.clear();
            debug!("Context cache cleared");
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        match &self.cache {
            Some(cache) => {
                let cache = cache.lock().await;
                CacheStats {
                    entries: cache.len(),
                    capacity: cache.cap().get(),
                }
            }
            None => CacheStats {
                entries: 0,
                capacity: 0,
            },
        }
    }

    async fn query_embedding(&self, query: &str) -> Option<Vec<f32>> {
        let Some(manager) = self.indexer.embeddings() else {
            debug!("No embedding provider configured; skipping retrieval");
            return None;
        };

        if let Some(vector) = self.cached(query).await {
            debug!("Cache hit for query: {query}");
            return Some(vector);
        }

        let vector = manager.embed_query(query).await?;
        if let Some(cache) = &self.cache {
            cache.lock().await.put(query.to_string(), vector.clone());
        }
        Some(vector)
    }

    async fn cached(&self, query: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        cache.lock().await.get(query).cloned()
    }
}

/// Path relative to the root containing it, for readable headers.
fn display_path(path: &Path, roots: &[PathBuf]) -> String {
    roots
        .iter()
        .filter_map(|root| path.strip_prefix(root).ok())
        .min_by_key(|relative| relative.components().count())
        .unwrap_or(path)
        .display()
        .to_string()
}
