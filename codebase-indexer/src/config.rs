use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for codebase indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Directories to index
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Extra gitignore-style exclude patterns
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Honour the `.gitignore` at each root
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Maximum concurrent file processing
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Compute a whole-file embedding per file
    #[serde(default = "default_true")]
    pub embed_files: bool,

    /// Compute an embedding per declared symbol
    #[serde(default = "default_true")]
    pub embed_symbols: bool,

    /// On a failed re-index, keep the previous healthy entry instead of
    /// replacing it with an empty, error-marked one.
    #[serde(default)]
    pub retain_last_good_on_error: bool,

    /// Quiet period before a watched path is re-indexed
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_true() -> bool {
    true
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

fn default_max_concurrent() -> usize {
    num_cpus::get()
}

fn default_watch_debounce_ms() -> u64 {
    300
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            ignore_patterns: Vec::new(),
            respect_gitignore: true,
            max_file_bytes: default_max_file_bytes(),
            max_concurrent: default_max_concurrent(),
            embed_files: true,
            embed_symbols: true,
            retain_last_good_on_error: false,
            watch_debounce_ms: default_watch_debounce_ms(),
        }
    }
}

impl IndexerConfig {
    pub fn with_roots(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.roots.is_empty() {
            return Err("No roots configured".to_string());
        }

        if self.max_concurrent == 0 {
            return Err("Max concurrent must be > 0".to_string());
        }

        if self.max_file_bytes == 0 {
            return Err("Max file bytes must be > 0".to_string());
        }

        Ok(())
    }
}
