//! Document store for document records and their chunk lists.
//!
//! Kept separate from vector data: every ingested document is recorded here,
//! whether or not its chunks could be embedded.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::document::{Chunk, Document, DocumentUpdate};
use crate::error::{KnowledgeError, Result};

/// Persistence for document metadata and chunk associations per knowledge base.
///
/// Lookups are deliberately asymmetric: [`get_document`](DocumentStore::get_document)
/// is strict and fails with [`KnowledgeError::NotFound`], while listing and
/// chunk retrieval return empty results for unknown IDs.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a document and its chunks, replacing any previous record with the same ID.
    async fn add_document(&self, kb_id: &str, document: &Document, chunks: &[Chunk]) -> Result<()>;

    /// Fetch one document.
    async fn get_document(&self, kb_id: &str, document_id: &str) -> Result<Document>;

    /// List the documents of a knowledge base, oldest upload first.
    async fn list_documents(&self, kb_id: &str) -> Result<Vec<Document>>;

    /// Fetch the chunks of one document in index order (empty if absent).
    async fn get_chunks(&self, kb_id: &str, document_id: &str) -> Result<Vec<Chunk>>;

    /// Apply a typed update to a document and return the updated record.
    async fn update_document(
        &self,
        kb_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document>;

    /// Remove a document and its chunks. Succeeds if it is already absent.
    async fn delete_document(&self, kb_id: &str, document_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DocumentKey {
    kb_id: String,
    document_id: String,
}

impl DocumentKey {
    fn new(kb_id: &str, document_id: &str) -> Self {
        Self { kb_id: kb_id.to_string(), document_id: document_id.to_string() }
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    document: Document,
    chunks: Vec<Chunk>,
}

/// A [`DocumentStore`] held in process memory.
///
/// Records are keyed by (knowledge-base ID, document ID). One reader/writer
/// lock guards the whole store.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentKey, StoredDocument>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(kb_id: &str, document_id: &str) -> KnowledgeError {
    KnowledgeError::NotFound {
        knowledge_base_id: kb_id.to_string(),
        document_id: document_id.to_string(),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn add_document(&self, kb_id: &str, document: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut documents = self.documents.write().await;
        let mut chunks = chunks.to_vec();
        chunks.sort_by_key(|chunk| chunk.index);
        documents.insert(
            DocumentKey::new(kb_id, &document.id),
            StoredDocument { document: document.clone(), chunks },
        );
        info!(
            kb_id,
            doc_id = %document.id,
            chunks = document.chunk_count,
            "added document to store"
        );
        Ok(())
    }

    async fn get_document(&self, kb_id: &str, document_id: &str) -> Result<Document> {
        let documents = self.documents.read().await;
        documents
            .get(&DocumentKey::new(kb_id, document_id))
            .map(|stored| stored.document.clone())
            .ok_or_else(|| not_found(kb_id, document_id))
    }

    async fn list_documents(&self, kb_id: &str) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut listed: Vec<Document> = documents
            .iter()
            .filter(|(key, _)| key.kb_id == kb_id)
            .map(|(_, stored)| stored.document.clone())
            .collect();
        listed.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn get_chunks(&self, kb_id: &str, document_id: &str) -> Result<Vec<Chunk>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&DocumentKey::new(kb_id, document_id))
            .map(|stored| stored.chunks.clone())
            .unwrap_or_default())
    }

    async fn update_document(
        &self,
        kb_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document> {
        let mut documents = self.documents.write().await;
        let stored = documents
            .get_mut(&DocumentKey::new(kb_id, document_id))
            .ok_or_else(|| not_found(kb_id, document_id))?;
        update.apply(&mut stored.document);
        Ok(stored.document.clone())
    }

    async fn delete_document(&self, kb_id: &str, document_id: &str) -> Result<()> {
        let mut documents = self.documents.write().await;
        if documents.remove(&DocumentKey::new(kb_id, document_id)).is_some() {
            info!(kb_id, doc_id = document_id, "deleted document from store");
        }
        Ok(())
    }
}
