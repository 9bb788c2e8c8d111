use crate::DEFAULT_EMBEDDING_DIM;
use crate::OPENAI_EMBEDDING_DIM;
use fastembed::EmbeddingModel;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local ONNX model via fastembed
    #[default]
    Local,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAi,
}

/// Embedding configuration, shared by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Whether files and symbols get embeddings at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub provider: ProviderKind,

    /// Symbol text is cut to this many characters before embedding
    #[serde(default = "default_max_symbol_chars")]
    pub max_symbol_chars: usize,

    /// Upper bound for a single embedding call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub local: LocalModelConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_max_symbol_chars() -> usize {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: ProviderKind::default(),
            max_symbol_chars: default_max_symbol_chars(),
            request_timeout_secs: default_request_timeout_secs(),
            local: LocalModelConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_symbol_chars == 0 {
            return Err("max_symbol_chars must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        match self.provider {
            ProviderKind::Local => self.local.validate(),
            ProviderKind::OpenAi => self.openai.validate(),
        }
    }
}

/// Settings for the local fastembed model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModelConfig {
    #[serde(default)]
    pub model: EmbeddingModelType,

    /// Target embedding dimension (Matryoshka truncation)
    #[serde(default = "default_local_dimension")]
    pub dimension: usize,

    /// Maximum batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Show download progress when downloading models
    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_local_dimension() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_batch_size() -> usize {
    32
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModelType::default(),
            dimension: default_local_dimension(),
            batch_size: default_batch_size(),
            show_download_progress: false,
        }
    }
}

impl LocalModelConfig {
    fn validate(&self) -> Result<(), String> {
        if self.dimension == 0 || self.dimension > self.model.native_dimension() {
            return Err(format!(
                "local dimension must be between 1 and {}",
                self.model.native_dimension()
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Supported local embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModelType {
    /// Nomic-embed-text-v1.5 (recommended for code)
    #[default]
    NomicEmbedTextV15,
    /// All-MiniLM-L6-v2 (lightweight, faster)
    AllMiniLmL6V2,
}

impl EmbeddingModelType {
    pub(crate) fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
            EmbeddingModelType::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
        }
    }

    /// Width of the vectors the model emits before truncation.
    pub fn native_dimension(self) -> usize {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => 768,
            EmbeddingModelType::AllMiniLmL6V2 => 384,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
            EmbeddingModelType::AllMiniLmL6V2 => "all-minilm-l6-v2",
        }
    }
}

/// Settings for an OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_dimension")]
    pub dimension: usize,

    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_openai_dimension() -> usize {
    OPENAI_EMBEDDING_DIM
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_openai_model(),
            dimension: default_openai_dimension(),
            api_key: None,
        }
    }
}

impl OpenAiConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("openai.base_url must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("openai.model must not be empty".to_string());
        }
        if self.dimension == 0 {
            return Err("openai.dimension must be greater than 0".to_string());
        }
        Ok(())
    }
}
