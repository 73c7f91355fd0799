//! OpenAI-compatible embedding provider.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{DEFAULT_API_BASE, DEFAULT_EMBEDDING_MODEL, EmbeddingConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{KnowledgeError, Result};

const PROVIDER: &str = "OpenAI";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings` API.
///
/// Uses `reqwest` to call `{api_base}/embeddings` directly, so any server
/// speaking the same protocol (OpenAI, Azure-style gateways, local model
/// servers) can be used by changing the base URL.
///
/// # Example
///
/// ```rust,ignore
/// use agent_platform_knowledge::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?
///     .with_api_base("http://localhost:8080/v1")
///     .with_model("bge-m3");
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    /// If set, passed to the API for Matryoshka dimension truncation.
    dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key, default base URL and model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(KnowledgeError::embedding(PROVIDER, "API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            api_base: DEFAULT_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: None,
        })
    }

    /// Create a provider from an [`EmbeddingConfig`].
    ///
    /// Returns `Ok(None)` when the config carries no usable API key, which
    /// callers treat as "no embedding provider configured".
    pub fn from_config(config: &EmbeddingConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.usable_api_key() else {
            return Ok(None);
        };
        let mut provider = Self::new(api_key)?
            .with_api_base(config.api_base.clone())
            .with_model(config.model.clone());
        provider.dimensions = config.dimensions;
        Ok(Some(provider))
    }

    /// Set the API base URL (without the trailing `/embeddings`).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request embeddings truncated to `dims` dimensions.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = Some(dims);
        self
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.api_base)
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Order response items by their `index` field, requiring exactly one per input.
fn order_by_index(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(KnowledgeError::embedding(
            PROVIDER,
            format!("expected {expected} embeddings, got {}", data.len()),
        ));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let Some(slot) = slots.get_mut(item.index) else {
            return Err(KnowledgeError::embedding(
                PROVIDER,
                format!("embedding index {} out of range for {expected} inputs", item.index),
            ));
        };
        if slot.is_some() {
            return Err(KnowledgeError::embedding(
                PROVIDER,
                format!("duplicate embedding for input {}", item.index),
            ));
        }
        *slot = Some(item.embedding);
    }

    // Counts match and no slot was filled twice, so every slot is filled.
    Ok(slots.into_iter().flatten().collect())
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            provider = PROVIDER,
            text_len = text.len(),
            model = %self.model,
            "embedding single text"
        );

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::embedding(PROVIDER, "API returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                KnowledgeError::embedding(PROVIDER, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(KnowledgeError::embedding(
                PROVIDER,
                format!("API returned {status}: {detail}"),
            ));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            KnowledgeError::embedding(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        order_by_index(embedding_response.data, texts.len())
    }
}
