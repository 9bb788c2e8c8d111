//! `codescope.toml` loading.

use anyhow::Context;
use anyhow::Result;
use codescope_codebase_context::ContextConfig;
use codescope_codebase_indexer::IndexerConfig;
use codescope_embeddings::EmbeddingConfig;
use log::debug;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Settings file looked up at the project root.
pub const SETTINGS_FILE_NAME: &str = "codescope.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub context: ContextConfig,
}

impl Settings {
    /// Reads `path`, or returns defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Anchors relative roots at `base`.
    pub fn resolve_roots(&mut self, base: &Path) {
        self.indexer.roots = self
            .indexer
            .roots
            .iter()
            .map(|root| {
                if root.is_absolute() {
                    root.clone()
                } else {
                    base.join(root)
                }
            })
            .collect::<Vec<PathBuf>>();
    }
}
