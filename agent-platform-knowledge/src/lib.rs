//! # agent-platform-knowledge
//!
//! Knowledge-base retrieval for the agent platform.
//!
//! ## Overview
//!
//! Documents uploaded to a knowledge base are split into overlapping chunks,
//! embedded, and stored per knowledge base. At query time the question is
//! embedded, the nearest chunks are retrieved by cosine similarity, and their
//! text is assembled into context for an agent's system prompt.
//!
//! - [`SeparatorChunker`] - separator-aware chunking with character overlap
//! - [`EmbeddingProvider`] - embedding backends ([`OpenAIEmbeddingProvider`] with the
//!   `openai` feature)
//! - [`VectorStore`] - [`InMemoryVectorStore`], or `PgVectorStore` with the `pgvector` feature
//! - [`DocumentStore`] - document records and chunk lists
//! - [`KnowledgeManager`] - ingestion, search and context assembly
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agent_platform_knowledge::{
//!     DocumentInput, KnowledgeConfig, KnowledgeManager, OpenAIEmbeddingProvider,
//! };
//!
//! let config = KnowledgeConfig::from_env()?;
//! let embedder = OpenAIEmbeddingProvider::from_config(&config.embedding)?;
//! let manager = KnowledgeManager::builder()
//!     .config(config)
//!     .maybe_embedding_provider(embedder.map(|e| Arc::new(e) as _))
//!     .build()?;
//!
//! manager.add_document("kb-1", DocumentInput::new("Handbook", handbook_text)).await?;
//! let context = manager.get_relevant_context("kb-1", "How many leave days?", 3).await?;
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` (default) | OpenAI-compatible embeddings over HTTP |
//! | `pgvector` | PostgreSQL + pgvector vector store |
//! | `full` | Everything |

pub mod chunking;
pub mod config;
pub mod context;
pub mod docstore;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod manager;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{Chunker, SeparatorChunker, chunk_text};
pub use config::{ChunkConfig, EmbeddingConfig, KnowledgeConfig, KnowledgeConfigBuilder};
pub use context::{CONTEXT_SEPARATOR, KnowledgeContext, augment_system_prompt, join_results};
pub use docstore::{DocumentStore, InMemoryDocumentStore};
pub use document::{
    Chunk, ContentType, Document, DocumentInput, DocumentStatus, DocumentUpdate,
    KnowledgeBaseStats, Metadata, SearchResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{KnowledgeError, Result};
pub use inmemory::{InMemoryVectorStore, cosine_similarity};
pub use manager::{KnowledgeManager, KnowledgeManagerBuilder};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "pgvector")]
pub use pgvector::PgVectorStore;
pub use vectorstore::VectorStore;
