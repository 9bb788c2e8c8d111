#![allow(dead_code)]

use async_trait::async_trait;
use codescope_embeddings::Embedder;
use codescope_embeddings::EmbeddingError;
use codescope_embeddings::EmbeddingManager;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::watch;

pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create dir");
    }
    fs::write(&path, content).expect("Failed to write file");
    dunce::canonicalize(&path).expect("Failed to canonicalize")
}

/// Unit vector whose cosine against `[1, 0]` is `cos`.
pub fn at_similarity(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).sqrt()]
}

/// Maps text to a fixed vector by the first matching keyword.
pub struct KeywordEmbedder {
    rules: Vec<(&'static str, Vec<f32>)>,
    fallback: Vec<f32>,
}

impl KeywordEmbedder {
    pub fn new(rules: Vec<(&'static str, Vec<f32>)>) -> Self {
        Self {
            rules,
            fallback: vec![0.0, 1.0],
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .rules
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, vector)| vector.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn dimension(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Blocks every call while the gate is closed, so a build can be held in
/// its embedding phase.
pub struct GatedEmbedder {
    open: watch::Receiver<bool>,
    pub entered: Notify,
}

impl GatedEmbedder {
    pub fn new() -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(true);
        (
            Arc::new(Self {
                open: rx,
                entered: Notify::new(),
            }),
            tx,
        )
    }
}

#[async_trait]
impl Embedder for GatedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut open = self.open.clone();
        if !*open.borrow() {
            self.entered.notify_one();
        }
        open.wait_for(|open| *open)
            .await
            .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))?;
        Ok(vec![1.0, 0.0])
    }

    fn dimension(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "gated"
    }
}

pub fn manager(embedder: Arc<dyn Embedder>) -> EmbeddingManager {
    EmbeddingManager::with_limits(embedder, 1000, Duration::from_secs(60))
}

/// Errors on text containing `fail_on`, never answers text containing
/// `hang_on`, and returns `[1, 0]` for everything else.
pub struct UnreliableEmbedder {
    fail_on: &'static str,
    hang_on: &'static str,
}

impl UnreliableEmbedder {
    pub fn new(fail_on: &'static str, hang_on: &'static str) -> Self {
        Self { fail_on, hang_on }
    }
}

#[async_trait]
impl Embedder for UnreliableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains(self.fail_on) {
            return Err(EmbeddingError::Request("provider returned 500".to_string()));
        }
        if text.contains(self.hang_on) {
            return std::future::pending().await;
        }
        Ok(vec![1.0, 0.0])
    }

    fn dimension(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "unreliable"
    }
}
