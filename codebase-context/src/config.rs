use codescope_codebase_indexer::SearchOptions;
use codescope_codebase_indexer::SearchScope;
use serde::Deserialize;
use serde::Serialize;

/// Configuration for the RAG context builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// When false, every query yields an empty context
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of results quoted per query
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Results scoring below this cosine similarity are dropped
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Upper bound on one excerpt, in characters, marker included
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Which embeddings to search
    #[serde(default)]
    pub scope: SearchScope,

    /// Query embeddings kept in memory (0 disables the cache)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_top_n() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.7
}

fn default_max_chunk_chars() -> usize {
    2000
}

fn default_cache_size() -> usize {
    100
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            top_n: default_top_n(),
            min_similarity: default_min_similarity(),
            max_chunk_chars: default_max_chunk_chars(),
            scope: SearchScope::default(),
            cache_size: default_cache_size(),
        }
    }
}

impl ContextConfig {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            scope: self.scope,
            top_n: self.top_n,
            min_similarity: self.min_similarity,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.top_n == 0 {
            return Err("top_n must be at least 1".to_string());
        }
        if !(-1.0..=1.0).contains(&self.min_similarity) {
            return Err(format!(
                "min_similarity must be within [-1, 1], got {}",
                self.min_similarity
            ));
        }
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be positive".to_string());
        }
        Ok(())
    }
}
