//! Knowledge manager: the façade over chunking, embedding and storage.
//!
//! The [`KnowledgeManager`] coordinates document ingestion
//! (chunk → embed → store) and retrieval (embed query → search → assemble
//! context). Ingestion tolerates a failing or missing embedding provider;
//! search does not.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_platform_knowledge::{DocumentInput, KnowledgeConfig, KnowledgeManager};
//!
//! let manager = KnowledgeManager::builder()
//!     .config(KnowledgeConfig::from_env()?)
//!     .embedding_provider(Arc::new(embedder))
//!     .build()?;
//!
//! manager.add_document("kb-1", DocumentInput::new("Handbook", text)).await?;
//! let context = manager.get_relevant_context("kb-1", "How do I apply for leave?", 3).await?;
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::{Chunker, SeparatorChunker};
use crate::config::KnowledgeConfig;
use crate::context::{KnowledgeContext, join_results};
use crate::docstore::{DocumentStore, InMemoryDocumentStore};
use crate::document::{
    Chunk, Document, DocumentInput, DocumentStatus, DocumentUpdate, KnowledgeBaseStats,
    SearchResult,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{KnowledgeError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::vectorstore::VectorStore;

/// The knowledge-base façade consumed by the conversation flow.
///
/// All state lives in the injected stores; the manager itself is immutable
/// and can be shared across tasks behind an `Arc`. Construct one via
/// [`KnowledgeManager::builder()`].
pub struct KnowledgeManager {
    config: KnowledgeConfig,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Arc<dyn VectorStore>,
    document_store: Arc<dyn DocumentStore>,
}

impl KnowledgeManager {
    /// Create a new [`KnowledgeManagerBuilder`].
    pub fn builder() -> KnowledgeManagerBuilder {
        KnowledgeManagerBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// Whether an embedding provider is configured.
    pub fn has_embedding_provider(&self) -> bool {
        self.embedding_provider.is_some()
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return a reference to the document store.
    pub fn document_store(&self) -> &Arc<dyn DocumentStore> {
        &self.document_store
    }

    /// Ingest a document: chunk → embed → store.
    ///
    /// Embedding failures are logged and the document is stored without
    /// vectors in [`DocumentStatus::Processing`], to be embedded later with
    /// [`reembed_document`](Self::reembed_document). Vectors are written to
    /// the vector store only when every chunk was embedded.
    ///
    /// # Errors
    ///
    /// - [`KnowledgeError::ChunkingError`] if the chunker fails.
    /// - [`KnowledgeError::StorageError`] if either store rejects the write. A
    ///   vector-store failure also removes the just-written document record.
    pub async fn add_document(&self, kb_id: &str, input: DocumentInput) -> Result<Document> {
        let DocumentInput { title, content, content_type, source, metadata } = input;
        let mut document = Document {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            content_type,
            source,
            metadata,
            uploaded_at: Utc::now(),
            chunk_count: 0,
            status: DocumentStatus::Processing,
        };

        let mut chunks = self.chunker.chunk(&document).map_err(|e| {
            error!(kb_id, doc_id = %document.id, error = %e, "chunking failed");
            e.with_context(format!("failed to chunk document '{}'", document.id))
        })?;
        document.chunk_count = chunks.len();

        let embedded = self.try_embed(kb_id, &document.id, &mut chunks).await;
        if embedded || chunks.is_empty() {
            document.status = DocumentStatus::Ready;
        }

        self.document_store.add_document(kb_id, &document, &chunks).await.map_err(|e| {
            error!(kb_id, doc_id = %document.id, error = %e, "failed to store document");
            e.with_context(format!("failed to store document '{}'", document.id))
        })?;

        if embedded {
            if let Err(e) = self.vector_store.add_chunks(kb_id, &chunks).await {
                error!(kb_id, doc_id = %document.id, error = %e, "failed to store vectors");
                if let Err(cleanup) =
                    self.document_store.delete_document(kb_id, &document.id).await
                {
                    warn!(
                        kb_id,
                        doc_id = %document.id,
                        error = %cleanup,
                        "failed to roll back document record"
                    );
                }
                return Err(e.with_context(format!(
                    "failed to add chunks of document '{}' to vector store",
                    document.id
                )));
            }
        }

        info!(
            kb_id,
            doc_id = %document.id,
            chunks = document.chunk_count,
            embedded,
            "document added"
        );
        Ok(document)
    }

    /// Embed chunks in place, returning whether vectors were attached.
    async fn try_embed(&self, kb_id: &str, document_id: &str, chunks: &mut [Chunk]) -> bool {
        let Some(provider) = &self.embedding_provider else {
            warn!(
                kb_id,
                doc_id = document_id,
                "no embedding provider configured, storing without vectors"
            );
            return false;
        };
        if chunks.is_empty() {
            return false;
        }

        info!(kb_id, doc_id = document_id, chunks = chunks.len(), "generating embeddings");
        match provider.embed_chunks(chunks).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    kb_id,
                    doc_id = document_id,
                    error = %e,
                    "failed to generate embeddings, continuing without vectors"
                );
                false
            }
        }
    }

    /// Embed the stored chunks of a document and (re)write its vectors.
    ///
    /// Used to finish documents left in [`DocumentStatus::Processing`].
    /// Existing vectors of the document are replaced, so calling this on a
    /// `Ready` document is harmless. If the new vectors cannot be written the
    /// document is set back to `Processing`.
    ///
    /// # Errors
    ///
    /// - [`KnowledgeError::EmbeddingUnavailable`] without an embedding provider.
    /// - [`KnowledgeError::NotFound`] if the document does not exist.
    /// - [`KnowledgeError::EmbeddingError`] / [`KnowledgeError::StorageError`] on failure.
    pub async fn reembed_document(&self, kb_id: &str, document_id: &str) -> Result<Document> {
        let provider = self.require_provider()?;
        let mut document = self.document_store.get_document(kb_id, document_id).await?;
        let mut chunks = self.document_store.get_chunks(kb_id, document_id).await?;

        provider
            .embed_chunks(&mut chunks)
            .await
            .map_err(|e| e.with_context(format!("failed to embed document '{document_id}'")))?;

        let context = || format!("failed to store vectors of document '{document_id}'");
        self.vector_store
            .delete_document(kb_id, document_id)
            .await
            .map_err(|e| e.with_context(context()))?;
        if let Err(e) = self.vector_store.add_chunks(kb_id, &chunks).await {
            // The old vectors are gone, so the document is no longer searchable.
            self.mark_processing(kb_id, document_id).await;
            return Err(e.with_context(context()));
        }

        document.status = DocumentStatus::Ready;
        self.document_store
            .add_document(kb_id, &document, &chunks)
            .await
            .map_err(|e| e.with_context(format!("failed to update document '{document_id}'")))?;

        info!(kb_id, doc_id = document_id, chunks = chunks.len(), "document re-embedded");
        Ok(document)
    }

    async fn mark_processing(&self, kb_id: &str, document_id: &str) {
        let update = DocumentUpdate { status: Some(DocumentStatus::Processing), metadata: None };
        if let Err(e) = self.document_store.update_document(kb_id, document_id, update).await {
            error!(kb_id, doc_id = document_id, error = %e, "failed to reset document status");
        }
    }

    /// Semantic search in a knowledge base.
    ///
    /// # Errors
    ///
    /// - [`KnowledgeError::EmbeddingUnavailable`] if no embedding provider is
    ///   configured. Search never silently returns empty results in that case.
    /// - [`KnowledgeError::EmbeddingError`] if the query cannot be embedded.
    /// - [`KnowledgeError::StorageError`] if the vector store fails.
    pub async fn search(
        &self,
        kb_id: &str,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let provider = self.require_provider()?;
        info!(kb_id, query_len = query.len(), top_k, threshold, "searching knowledge base");

        let query_embedding = provider.embed(query).await.map_err(|e| {
            error!(kb_id, error = %e, "query embedding failed");
            e.with_context(format!("failed to embed query for knowledge base '{kb_id}'"))
        })?;

        let results =
            self.vector_store.search(kb_id, &query_embedding, top_k, threshold).await.map_err(|e| {
                error!(kb_id, error = %e, "vector store search failed");
                e.with_context(format!("failed to search knowledge base '{kb_id}'"))
            })?;

        info!(kb_id, results = results.len(), "search completed");
        Ok(results)
    }

    /// Retrieve context for a RAG prompt.
    ///
    /// Searches with the configured context threshold (0.7 by default) and
    /// joins the chunk contents, best match first, with
    /// [`CONTEXT_SEPARATOR`](crate::context::CONTEXT_SEPARATOR). Returns an
    /// empty string when nothing clears the threshold.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub async fn get_relevant_context(
        &self,
        kb_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<String> {
        let results = self.search(kb_id, query, top_k, self.config.context_threshold).await?;
        Ok(join_results(&results))
    }

    /// Retrieve context from several knowledge bases for one query.
    ///
    /// Knowledge bases that fail or yield no context are logged and skipped,
    /// so one broken knowledge base never blocks a conversation turn. The
    /// output keeps the input order and labels each context with its own ID.
    pub async fn collect_context(
        &self,
        kb_ids: &[String],
        query: &str,
        top_k: usize,
    ) -> Vec<KnowledgeContext> {
        let mut contexts = Vec::new();
        for kb_id in kb_ids {
            match self.get_relevant_context(kb_id, query, top_k).await {
                Ok(context) if !context.is_empty() => {
                    contexts.push(KnowledgeContext { knowledge_base_id: kb_id.clone(), context });
                }
                Ok(_) => {}
                Err(e) => warn!(kb_id = %kb_id, error = %e, "skipping knowledge base context"),
            }
        }
        contexts
    }

    /// Fetch one document.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::NotFound`] if the document does not exist.
    pub async fn get_document(&self, kb_id: &str, document_id: &str) -> Result<Document> {
        self.document_store.get_document(kb_id, document_id).await
    }

    /// List the documents of a knowledge base (empty if unknown).
    pub async fn list_documents(&self, kb_id: &str) -> Result<Vec<Document>> {
        self.document_store.list_documents(kb_id).await.map_err(|e| {
            e.with_context(format!("failed to list documents of knowledge base '{kb_id}'"))
        })
    }

    /// Fetch the chunks of a document (empty if unknown).
    pub async fn get_chunks(&self, kb_id: &str, document_id: &str) -> Result<Vec<Chunk>> {
        self.document_store.get_chunks(kb_id, document_id).await.map_err(|e| {
            e.with_context(format!("failed to load chunks of document '{document_id}'"))
        })
    }

    /// Apply a typed update to a document's caller-maintained fields.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::NotFound`] if the document does not exist.
    pub async fn update_document(
        &self,
        kb_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document> {
        self.document_store.update_document(kb_id, document_id, update).await
    }

    /// Remove a document's vectors and its record. Idempotent.
    pub async fn delete_document(&self, kb_id: &str, document_id: &str) -> Result<()> {
        self.vector_store
            .delete_document(kb_id, document_id)
            .await
            .map_err(|e| {
                e.with_context(format!("failed to delete vectors of document '{document_id}'"))
            })?;
        self.document_store
            .delete_document(kb_id, document_id)
            .await
            .map_err(|e| e.with_context(format!("failed to delete document '{document_id}'")))?;
        info!(kb_id, doc_id = document_id, "document deleted");
        Ok(())
    }

    /// Remove all vectors and documents of a knowledge base.
    ///
    /// Vectors go first. Documents are then deleted one by one; a failure on
    /// one document is logged and the cascade continues.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::StorageError`] if the vectors or the document
    /// list cannot be removed or read.
    pub async fn delete_knowledge_base(&self, kb_id: &str) -> Result<()> {
        self.vector_store
            .delete_knowledge_base(kb_id)
            .await
            .map_err(|e| {
                e.with_context(format!("failed to delete vectors of knowledge base '{kb_id}'"))
            })?;

        let documents = self.list_documents(kb_id).await?;
        let mut failed = 0usize;
        for document in &documents {
            if let Err(e) = self.document_store.delete_document(kb_id, &document.id).await {
                failed += 1;
                error!(kb_id, doc_id = %document.id, error = %e, "failed to delete document");
            }
        }

        info!(kb_id, documents = documents.len(), failed, "knowledge base deleted");
        Ok(())
    }

    /// Document count from the document store and chunk count from the vector store.
    ///
    /// The counts diverge for documents ingested without vectors.
    pub async fn get_stats(&self, kb_id: &str) -> Result<KnowledgeBaseStats> {
        let document_count = self.list_documents(kb_id).await?.len();
        let chunk_count = self.vector_store.chunk_count(kb_id).await.map_err(|e| {
            e.with_context(format!("failed to count chunks of knowledge base '{kb_id}'"))
        })?;
        Ok(KnowledgeBaseStats { document_count, chunk_count })
    }

    fn require_provider(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.embedding_provider.as_ref().ok_or_else(|| {
            KnowledgeError::EmbeddingUnavailable(
                "no embedding provider configured (set OPENAI_API_KEY)".to_string(),
            )
        })
    }
}

/// Builder for constructing a [`KnowledgeManager`].
///
/// Every component is optional: the chunker defaults to a
/// [`SeparatorChunker`] over the configured [`ChunkConfig`](crate::ChunkConfig),
/// both stores default to their in-memory implementations, and without an
/// embedding provider ingestion stores documents without vectors while
/// search fails with [`KnowledgeError::EmbeddingUnavailable`].
///
/// # Example
///
/// ```rust,ignore
/// let manager = KnowledgeManager::builder()
///     .config(config)
///     .embedding_provider(Arc::new(embedder))   // optional
///     .vector_store(Arc::new(pg_store))          // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct KnowledgeManagerBuilder {
    config: Option<KnowledgeConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    document_store: Option<Arc<dyn DocumentStore>>,
}

impl KnowledgeManagerBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: KnowledgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the embedding provider if one is given.
    pub fn maybe_embedding_provider(
        mut self,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        self.embedding_provider = provider;
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document store backend.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Build the [`KnowledgeManager`].
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::ConfigError`] if the chunk configuration is invalid.
    pub fn build(self) -> Result<KnowledgeManager> {
        let config = self.config.unwrap_or_default();
        config.chunk.validate()?;

        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(SeparatorChunker::new(config.chunk.clone())));
        let vector_store =
            self.vector_store.unwrap_or_else(|| Arc::new(InMemoryVectorStore::new()));
        let document_store =
            self.document_store.unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));

        if self.embedding_provider.is_none() {
            warn!("embedding provider not configured, search will be unavailable");
        }

        Ok(KnowledgeManager {
            config,
            chunker,
            embedding_provider: self.embedding_provider,
            vector_store,
            document_store,
        })
    }
}
