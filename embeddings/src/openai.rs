use crate::Embedder;
use crate::OpenAiConfig;
use crate::error::EmbeddingError;
use crate::error::Result;
use crate::validate_vector;
use async_trait::async_trait;
use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Provider for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    config: OpenAiConfig,
    api_key: String,
    name: String,
}

impl OpenAiEmbedder {
    /// Build a client, resolving the API key from config or `OPENAI_API_KEY`.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = match config.api_key.clone().filter(|k| !k.trim().is_empty()) {
            Some(key) => key,
            None => std::env::var(OPENAI_API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| EmbeddingError::MissingApiKey(OPENAI_API_KEY_ENV.to_string()))?,
        };
        Self::with_timeout(config, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: OpenAiConfig, api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            name: format!("openai/{}", config.model),
            config,
            api_key,
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| EmbeddingError::InvalidInput(format!("invalid API key: {e}")))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        debug!("POST {url} ({} chars)", text.chars().count());
        let resp = self
            .http
            .post(url)
            .headers(self.auth_headers()?)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: text,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http { status, body });
        }

        let body: EmbeddingResponse = resp.json().await?;
        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .unwrap_or_default();
        validate_vector(embedding, self.config.dimension)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}
