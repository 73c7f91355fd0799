//! Error types for the `agent-platform-knowledge` crate.

use std::fmt::Display;

use thiserror::Error;

/// Errors that can occur in knowledge-base operations.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// An internal invariant was violated while segmenting a document.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// The embedding provider call failed or returned no usable data.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// No embedding provider is configured.
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A persistence failure in the document store or the vector store.
    #[error("Storage error ({backend}): {message}")]
    StorageError {
        /// The storage backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A strict lookup did not find the requested document.
    #[error("Document '{document_id}' not found in knowledge base '{knowledge_base_id}'")]
    NotFound {
        /// The knowledge base that was searched.
        knowledge_base_id: String,
        /// The document that was requested.
        document_id: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl KnowledgeError {
    /// Build a [`KnowledgeError::StorageError`].
    pub fn storage(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageError { backend: backend.into(), message: message.into() }
    }

    /// Build a [`KnowledgeError::EmbeddingError`].
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }

    /// Prefix the error message with the operation that was being attempted.
    ///
    /// The variant is preserved so callers can still match on the category.
    /// `NotFound` already names what was missing and is returned unchanged.
    pub fn with_context(self, context: impl Display) -> Self {
        match self {
            Self::ChunkingError(message) => Self::ChunkingError(format!("{context}: {message}")),
            Self::EmbeddingError { provider, message } => {
                Self::EmbeddingError { provider, message: format!("{context}: {message}") }
            }
            Self::EmbeddingUnavailable(message) => {
                Self::EmbeddingUnavailable(format!("{context}: {message}"))
            }
            Self::StorageError { backend, message } => {
                Self::StorageError { backend, message: format!("{context}: {message}") }
            }
            Self::ConfigError(message) => Self::ConfigError(format!("{context}: {message}")),
            not_found @ Self::NotFound { .. } => not_found,
        }
    }
}

/// A convenience result type for knowledge-base operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
