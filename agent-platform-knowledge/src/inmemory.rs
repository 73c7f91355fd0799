//! In-memory vector store using brute-force cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. Every search
//! scans all chunks of the knowledge base, which suits development, tests
//! and small deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// An in-memory vector store using cosine similarity for search.
///
/// Knowledge bases map to insertion-ordered chunk lists. One reader/writer
/// lock guards the whole store: writes exclude everything, reads run
/// concurrently.
///
/// # Example
///
/// ```rust,ignore
/// use agent_platform_knowledge::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add_chunks("kb-1", &embedded_chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    knowledge_bases: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if the vectors differ in length or either has zero magnitude.
/// Accumulates in `f64`; `cosine_similarity(v, v)` is exactly 1.0 for any
/// non-zero `v` and the function is symmetric.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()) as f32
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "InMemory"
    }

    async fn add_chunks(&self, kb_id: &str, chunks: &[Chunk]) -> Result<()> {
        let mut knowledge_bases = self.knowledge_bases.write().await;
        let stored = knowledge_bases.entry(kb_id.to_string()).or_default();
        stored.extend_from_slice(chunks);
        info!(kb_id, count = chunks.len(), total = stored.len(), "added chunks to vector store");
        Ok(())
    }

    async fn search(
        &self,
        kb_id: &str,
        embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let knowledge_bases = self.knowledge_bases.read().await;
        let Some(chunks) = knowledge_bases.get(kb_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<SearchResult> = chunks
            .iter()
            .filter_map(|chunk| {
                let score = cosine_similarity(embedding, chunk.embedding.as_deref()?);
                (score >= threshold).then(|| SearchResult {
                    chunk: chunk.clone(),
                    score,
                    document_id: chunk.document_id.clone(),
                })
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!(kb_id, results = scored.len(), top_k, threshold, "vector search completed");
        Ok(scored)
    }

    async fn delete_knowledge_base(&self, kb_id: &str) -> Result<()> {
        let mut knowledge_bases = self.knowledge_bases.write().await;
        knowledge_bases.remove(kb_id);
        info!(kb_id, "deleted knowledge base from vector store");
        Ok(())
    }

    async fn delete_document(&self, kb_id: &str, document_id: &str) -> Result<()> {
        let mut knowledge_bases = self.knowledge_bases.write().await;
        if let Some(chunks) = knowledge_bases.get_mut(kb_id) {
            let before = chunks.len();
            chunks.retain(|chunk| chunk.document_id != document_id);
            debug!(kb_id, document_id, removed = before - chunks.len(), "deleted document vectors");
        }
        Ok(())
    }

    async fn chunk_count(&self, kb_id: &str) -> Result<usize> {
        let knowledge_bases = self.knowledge_bases.read().await;
        Ok(knowledge_bases.get(kb_id).map_or(0, Vec::len))
    }
}
