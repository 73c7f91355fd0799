//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;
use tracing::debug;

use crate::document::Chunk;
use crate::error::{KnowledgeError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. Vector dimension is a property of the backend's model and is
/// not validated here. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use agent_platform_knowledge::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name used in errors and logs.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// Returns one vector per input, in input order. An empty batch returns
    /// an empty `Vec` without contacting the backend.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Embed the contents of `chunks` and attach the vectors.
    ///
    /// Vectors are assigned only once the whole batch succeeded and returned
    /// exactly one vector per chunk, so on error no chunk is modified.
    async fn embed_chunks(&self, chunks: &mut [Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let embeddings = {
            let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
            self.embed_batch(&texts).await?
        };
        if embeddings.len() != chunks.len() {
            return Err(KnowledgeError::embedding(
                self.name(),
                format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
            ));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
        }
        debug!(provider = self.name(), count = chunks.len(), "embedded chunks");
        Ok(())
    }
}
