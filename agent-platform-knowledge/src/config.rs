//! Configuration for chunking, embeddings, and context retrieval.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, Result};

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default characters carried over between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Default separator used to find natural split boundaries.
pub const DEFAULT_SEPARATOR: &str = "\n\n";
/// Default similarity threshold for context retrieval.
pub const DEFAULT_CONTEXT_THRESHOLD: f32 = 0.7;
/// Default number of chunks used for context retrieval.
pub const DEFAULT_CONTEXT_TOP_K: usize = 3;
/// Default OpenAI-compatible API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// API key value shipped in sample `.env` files; treated as unset.
const PLACEHOLDER_API_KEY: &str = "your-openai-api-key";

/// How documents are split into chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters retained from the tail of one chunk when starting the next.
    pub chunk_overlap: usize,
    /// Separator used to find natural split boundaries.
    pub separator: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ChunkConfig {
    /// Create a validated chunk configuration.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        separator: impl Into<String>,
    ) -> Result<Self> {
        let config = Self { chunk_size, chunk_overlap, separator: separator.into() };
        config.validate()?;
        Ok(config)
    }

    /// Check that `0 <= chunk_overlap < chunk_size` and the separator is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::ConfigError`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(KnowledgeError::ConfigError("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(KnowledgeError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separator.is_empty() {
            return Err(KnowledgeError::ConfigError("separator must not be empty".into()));
        }
        Ok(())
    }
}

/// Connection settings for an OpenAI-compatible embeddings API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Bearer token; `None` means no embedding provider is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    /// Embedding model identifier.
    pub model: String,
    /// Optional output dimension (also sizes the pgvector column).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: None,
        }
    }
}

impl EmbeddingConfig {
    /// Return the API key if one is usable.
    ///
    /// Empty keys and the sample placeholder count as not configured.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

/// Top-level configuration for a [`KnowledgeManager`](crate::KnowledgeManager).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeConfig {
    /// Chunking parameters.
    pub chunk: ChunkConfig,
    /// Embedding provider settings.
    pub embedding: EmbeddingConfig,
    /// Number of chunks used by `get_relevant_context`.
    pub context_top_k: usize,
    /// Minimum similarity used by `get_relevant_context`.
    pub context_threshold: f32,
    /// PostgreSQL URL for the persistent vector store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            embedding: EmbeddingConfig::default(),
            context_top_k: DEFAULT_CONTEXT_TOP_K,
            context_threshold: DEFAULT_CONTEXT_THRESHOLD,
            database_url: None,
        }
    }
}

impl KnowledgeConfig {
    /// Create a new builder for constructing a [`KnowledgeConfig`].
    pub fn builder() -> KnowledgeConfigBuilder {
        KnowledgeConfigBuilder::default()
    }

    /// Load configuration from process environment variables.
    ///
    /// See [`KnowledgeConfig::from_lookup`] for the variables read.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a key lookup function.
    ///
    /// Reads `KNOWLEDGE_CHUNK_SIZE`, `KNOWLEDGE_CHUNK_OVERLAP`,
    /// `KNOWLEDGE_CHUNK_SEPARATOR`, `OPENAI_API_KEY`, `OPENAI_API_BASE`,
    /// `EMBEDDING_MODEL`, `EMBEDDING_DIMENSION`, `KNOWLEDGE_CONTEXT_TOP_K`,
    /// `KNOWLEDGE_CONTEXT_THRESHOLD` and `DATABASE_URL`. Missing or empty
    /// variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::ConfigError`] if a numeric variable does not
    /// parse or the resulting configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(size) = parse_var(&get, "KNOWLEDGE_CHUNK_SIZE")? {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = parse_var(&get, "KNOWLEDGE_CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(separator) = lookup("KNOWLEDGE_CHUNK_SEPARATOR").filter(|s| !s.is_empty()) {
            builder = builder.separator(unescape(&separator));
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            builder = builder.embedding_model(model);
        }
        if let Some(dimensions) = parse_var(&get, "EMBEDDING_DIMENSION")? {
            builder = builder.embedding_dimensions(dimensions);
        }
        if let Some(top_k) = parse_var(&get, "KNOWLEDGE_CONTEXT_TOP_K")? {
            builder = builder.context_top_k(top_k);
        }
        if let Some(threshold) = parse_var(&get, "KNOWLEDGE_CONTEXT_THRESHOLD")? {
            builder = builder.context_threshold(threshold);
        }
        if let Some(url) = get("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        builder.build()
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| KnowledgeError::ConfigError(format!("invalid {key} '{raw}': {e}")))
        })
        .transpose()
}

/// Turn literal `\n` / `\t` escapes (as written in `.env` files) into characters.
fn unescape(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\t", "\t")
}

/// Builder for constructing a validated [`KnowledgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgeConfigBuilder {
    config: KnowledgeConfig,
}

impl KnowledgeConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk.chunk_overlap = overlap;
        self
    }

    /// Set the chunk separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.config.chunk.separator = separator.into();
        self
    }

    /// Set the embedding API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.embedding.api_key = Some(key.into());
        self
    }

    /// Set the embedding API base URL.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.embedding.api_base = base.into();
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding.model = model.into();
        self
    }

    /// Set the embedding dimension.
    pub fn embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.config.embedding.dimensions = Some(dimensions);
        self
    }

    /// Set the number of chunks used for context retrieval.
    pub fn context_top_k(mut self, top_k: usize) -> Self {
        self.config.context_top_k = top_k;
        self
    }

    /// Set the similarity threshold used for context retrieval.
    pub fn context_threshold(mut self, threshold: f32) -> Self {
        self.config.context_threshold = threshold;
        self
    }

    /// Set the PostgreSQL URL for the persistent vector store.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    /// Build the [`KnowledgeConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::ConfigError`] if:
    /// - the chunk configuration is invalid (see [`ChunkConfig::validate`])
    /// - `context_top_k == 0`
    /// - `context_threshold` is outside `[-1, 1]`
    /// - `embedding.dimensions == Some(0)`
    pub fn build(self) -> Result<KnowledgeConfig> {
        self.config.chunk.validate()?;
        if self.config.context_top_k == 0 {
            return Err(KnowledgeError::ConfigError(
                "context_top_k must be greater than zero".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.config.context_threshold) {
            return Err(KnowledgeError::ConfigError(format!(
                "context_threshold ({}) must be within [-1, 1]",
                self.config.context_threshold
            )));
        }
        if self.config.embedding.dimensions == Some(0) {
            return Err(KnowledgeError::ConfigError(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}
