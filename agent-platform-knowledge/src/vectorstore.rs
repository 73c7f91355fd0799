//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// Chunks are scoped by knowledge-base ID. Implementations must return
/// equivalent rankings for equivalent data: descending cosine similarity,
/// ties broken by insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use agent_platform_knowledge::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add_chunks("kb-1", &chunks).await?;
/// let results = store.search("kb-1", &query_embedding, 5, 0.7).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in errors and logs.
    fn name(&self) -> &str;

    /// Append chunks (with their embeddings) to a knowledge base.
    async fn add_chunks(&self, kb_id: &str, chunks: &[Chunk]) -> Result<()>;

    /// Return up to `top_k` chunks whose similarity to `embedding` is at
    /// least `threshold`, ordered by descending similarity.
    ///
    /// Chunks without an embedding are never returned. An unknown knowledge
    /// base yields an empty result.
    async fn search(
        &self,
        kb_id: &str,
        embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Remove every chunk of a knowledge base. No-op if it is unknown.
    async fn delete_knowledge_base(&self, kb_id: &str) -> Result<()>;

    /// Remove every chunk of one document. No-op if it is unknown.
    async fn delete_document(&self, kb_id: &str, document_id: &str) -> Result<()>;

    /// Number of chunks stored for a knowledge base (0 if unknown).
    async fn chunk_count(&self, kb_id: &str) -> Result<usize>;
}
