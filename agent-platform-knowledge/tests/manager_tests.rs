//! Integration tests for the knowledge manager façade.

mod common;

use std::sync::Arc;

use agent_platform_knowledge::{
    Chunk, DocumentInput, DocumentStatus, DocumentUpdate, InMemoryVectorStore, KnowledgeBaseStats,
    KnowledgeConfig, KnowledgeError, KnowledgeManager, Metadata, Result, SearchResult,
    VectorStore, augment_system_prompt,
};
use async_trait::async_trait;
use common::{FailingEmbedder, HashEmbedder, KeyedEmbedder, unit};

const SECTIONS: &str = "Section A text.\n\nSection B text.\n\nSection C text.";

fn config(chunk_size: usize, overlap: usize) -> KnowledgeConfig {
    KnowledgeConfig::builder().chunk_size(chunk_size).chunk_overlap(overlap).build().unwrap()
}

fn manager_with(
    embedder: Option<Arc<dyn agent_platform_knowledge::EmbeddingProvider>>,
) -> KnowledgeManager {
    KnowledgeManager::builder()
        .config(config(20, 0))
        .maybe_embedding_provider(embedder)
        .build()
        .unwrap()
}

/// A vector store whose writes always fail.
struct BrokenVectorStore;

#[async_trait]
impl VectorStore for BrokenVectorStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn add_chunks(&self, _kb_id: &str, _chunks: &[Chunk]) -> Result<()> {
        Err(KnowledgeError::storage("broken", "disk full"))
    }

    async fn search(&self, _: &str, _: &[f32], _: usize, _: f32) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }

    async fn delete_knowledge_base(&self, _kb_id: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_document(&self, _kb_id: &str, _document_id: &str) -> Result<()> {
        Ok(())
    }

    async fn chunk_count(&self, _kb_id: &str) -> Result<usize> {
        Ok(0)
    }
}

#[tokio::test]
async fn ingests_chunks_embeds_and_searches() {
    let manager = manager_with(Some(Arc::new(HashEmbedder::new())));
    let input = DocumentInput::new("Sections", SECTIONS).with_source("docs/sections.txt");

    let document = manager.add_document("kb", input).await.unwrap();
    assert_eq!(document.chunk_count, 3);
    assert_eq!(document.status, DocumentStatus::Ready);
    assert_eq!(document.source.as_deref(), Some("docs/sections.txt"));

    let chunks = manager.get_chunks("kb", &document.id).await.unwrap();
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, ["Section A text.", "Section B text.", "Section C text."]);
    assert!(chunks.iter().all(|c| c.embedding.is_some() && c.document_id == document.id));

    assert_eq!(
        manager.get_stats("kb").await.unwrap(),
        KnowledgeBaseStats { document_count: 1, chunk_count: 3 }
    );

    // The hash embedder maps identical text to identical vectors.
    let results = manager.search("kb", "Section B text.", 1, 0.0).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.content, "Section B text.");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[0].document_id, document.id);
}

#[tokio::test]
async fn failing_embedder_degrades_gracefully() {
    let manager = manager_with(Some(Arc::new(FailingEmbedder)));

    let document = manager.add_document("kb", DocumentInput::new("doc", SECTIONS)).await.unwrap();
    assert_eq!(document.chunk_count, 3);
    assert_eq!(document.status, DocumentStatus::Processing);

    assert_eq!(manager.get_document("kb", &document.id).await.unwrap().id, document.id);
    assert_eq!(manager.list_documents("kb").await.unwrap().len(), 1);
    assert_eq!(
        manager.get_stats("kb").await.unwrap(),
        KnowledgeBaseStats { document_count: 1, chunk_count: 0 }
    );
    let chunks = manager.get_chunks("kb", &document.id).await.unwrap();
    assert!(chunks.iter().all(|c| c.embedding.is_none()));

    let err = manager.search("kb", "anything", 3, 0.0).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::EmbeddingError { .. }));
}

#[tokio::test]
async fn missing_embedder_stores_documents_but_refuses_search() {
    let manager = manager_with(None);
    assert!(!manager.has_embedding_provider());

    let document = manager.add_document("kb", DocumentInput::new("doc", SECTIONS)).await.unwrap();
    assert_eq!(document.chunk_count, 3);
    assert_eq!(
        manager.get_stats("kb").await.unwrap(),
        KnowledgeBaseStats { document_count: 1, chunk_count: 0 }
    );

    let err = manager.search("kb", "query", 3, 0.0).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::EmbeddingUnavailable(_)));
    let err = manager.get_relevant_context("kb", "query", 3).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::EmbeddingUnavailable(_)));
    assert!(manager.collect_context(&["kb".to_string()], "query", 3).await.is_empty());
}

#[tokio::test]
async fn empty_document_has_no_chunks_and_is_ready() {
    let manager = manager_with(Some(Arc::new(HashEmbedder::new())));
    let input = DocumentInput::new("blank", "  \n\n  ");
    let document = manager.add_document("kb", input).await.unwrap();
    assert_eq!(document.chunk_count, 0);
    assert_eq!(document.status, DocumentStatus::Ready);
    assert_eq!(manager.get_stats("kb").await.unwrap().chunk_count, 0);
}

#[tokio::test]
async fn relevant_context_keeps_only_chunks_above_threshold() {
    let embedder = KeyedEmbedder::new(unit(3.0))
        .with("test query", unit(0.0))
        .with("alpha", unit(0.2))
        .with("bravo", unit(1.4))
        .with("charlie", unit(0.6))
        .with("delta", unit(1.0))
        .with("echo", unit(-1.2));
    let manager = KnowledgeManager::builder()
        .config(config(8, 0))
        .embedding_provider(Arc::new(embedder))
        .build()
        .unwrap();

    let content = "alpha\n\nbravo\n\ncharlie\n\ndelta\n\necho";
    let document = manager.add_document("kb", DocumentInput::new("words", content)).await.unwrap();
    assert_eq!(document.chunk_count, 5);

    let context = manager.get_relevant_context("kb", "test query", 3).await.unwrap();
    assert_eq!(context, "alpha\n\n---\n\ncharlie");

    assert_eq!(manager.get_relevant_context("kb", "unrelated", 3).await.unwrap(), "");
}

#[tokio::test]
async fn collects_context_per_knowledge_base_into_the_prompt() {
    let embedder = KeyedEmbedder::new(unit(3.0))
        .with("question", unit(0.0))
        .with("leave policy", unit(0.1))
        .with("vpn setup", unit(0.2));
    let manager = KnowledgeManager::builder()
        .config(config(50, 0))
        .embedding_provider(Arc::new(embedder))
        .build()
        .unwrap();

    manager.add_document("kb-hr", DocumentInput::new("hr", "leave policy")).await.unwrap();
    manager.add_document("kb-it", DocumentInput::new("it", "vpn setup")).await.unwrap();

    let kb_ids = ["kb-it".to_string(), "kb-empty".to_string(), "kb-hr".to_string()];
    let contexts = manager.collect_context(&kb_ids, "question", 3).await;
    let labels: Vec<&str> = contexts.iter().map(|c| c.knowledge_base_id.as_str()).collect();
    assert_eq!(labels, ["kb-it", "kb-hr"]);

    let prompt = augment_system_prompt(Some("You are helpful."), &contexts).unwrap();
    assert!(prompt.contains("[Knowledge Base kb-it]:\nvpn setup"));
    assert!(prompt.contains("[Knowledge Base kb-hr]:\nleave policy"));
}

#[tokio::test]
async fn deleting_a_knowledge_base_cascades() {
    let manager = manager_with(Some(Arc::new(HashEmbedder::new())));
    for title in ["one", "two", "three"] {
        manager.add_document("kb", DocumentInput::new(title, SECTIONS)).await.unwrap();
    }
    manager.add_document("kb-other", DocumentInput::new("keep", SECTIONS)).await.unwrap();
    assert_eq!(manager.get_stats("kb").await.unwrap().document_count, 3);

    manager.delete_knowledge_base("kb").await.unwrap();

    assert_eq!(manager.get_stats("kb").await.unwrap(), KnowledgeBaseStats::default());
    assert!(manager.list_documents("kb").await.unwrap().is_empty());
    assert_eq!(
        manager.get_stats("kb-other").await.unwrap(),
        KnowledgeBaseStats { document_count: 1, chunk_count: 3 }
    );

    // Deleting again is harmless.
    manager.delete_knowledge_base("kb").await.unwrap();
}

#[tokio::test]
async fn deleting_a_document_removes_vectors_and_record() {
    let manager = manager_with(Some(Arc::new(HashEmbedder::new())));
    let keep = manager.add_document("kb", DocumentInput::new("keep", SECTIONS)).await.unwrap();
    let gone = manager.add_document("kb", DocumentInput::new("gone", SECTIONS)).await.unwrap();

    manager.delete_document("kb", &gone.id).await.unwrap();
    manager.delete_document("kb", &gone.id).await.unwrap();

    assert!(matches!(
        manager.get_document("kb", &gone.id).await,
        Err(KnowledgeError::NotFound { .. })
    ));
    assert_eq!(
        manager.get_stats("kb").await.unwrap(),
        KnowledgeBaseStats { document_count: 1, chunk_count: 3 }
    );
    let results = manager.search("kb", "Section A text.", 10, -1.0).await.unwrap();
    assert!(results.iter().all(|r| r.document_id == keep.id));
}

#[tokio::test]
async fn reembedding_finishes_processing_documents() {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let degraded = KnowledgeManager::builder()
        .config(config(20, 0))
        .vector_store(store.clone())
        .embedding_provider(Arc::new(FailingEmbedder))
        .build()
        .unwrap();
    let document = degraded.add_document("kb", DocumentInput::new("doc", SECTIONS)).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Processing);
    assert!(matches!(
        degraded.reembed_document("kb", &document.id).await,
        Err(KnowledgeError::EmbeddingError { .. })
    ));

    // Same stores, working embedder.
    let healthy = KnowledgeManager::builder()
        .config(config(20, 0))
        .vector_store(store)
        .document_store(degraded.document_store().clone())
        .embedding_provider(Arc::new(HashEmbedder::new()))
        .build()
        .unwrap();

    let document = healthy.reembed_document("kb", &document.id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Ready);
    let stored = healthy.get_document("kb", &document.id).await.unwrap();
    assert_eq!(stored.status, DocumentStatus::Ready);
    assert_eq!(healthy.get_stats("kb").await.unwrap().chunk_count, 3);

    // A second pass replaces the vectors instead of duplicating them.
    healthy.reembed_document("kb", &document.id).await.unwrap();
    assert_eq!(healthy.get_stats("kb").await.unwrap().chunk_count, 3);

    assert!(matches!(
        healthy.reembed_document("kb", "missing").await,
        Err(KnowledgeError::NotFound { .. })
    ));
    assert!(matches!(
        manager_with(None).reembed_document("kb", &document.id).await,
        Err(KnowledgeError::EmbeddingUnavailable(_))
    ));
}

#[tokio::test]
async fn failed_reembed_returns_the_document_to_processing() {
    let ready = manager_with(Some(Arc::new(HashEmbedder::new())));
    let document = ready.add_document("kb", DocumentInput::new("doc", SECTIONS)).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Ready);

    // Same documents, but the vector store rejects writes.
    let broken = KnowledgeManager::builder()
        .config(config(20, 0))
        .vector_store(Arc::new(BrokenVectorStore))
        .document_store(ready.document_store().clone())
        .embedding_provider(Arc::new(HashEmbedder::new()))
        .build()
        .unwrap();

    let err = broken.reembed_document("kb", &document.id).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::StorageError { .. }), "got {err:?}");

    let stored = broken.get_document("kb", &document.id).await.unwrap();
    assert_eq!(stored.status, DocumentStatus::Processing);
    assert_eq!(stored.chunk_count, 3);
    assert_eq!(broken.get_chunks("kb", &document.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn vector_store_failure_rolls_back_the_document() {
    let manager = KnowledgeManager::builder()
        .config(config(20, 0))
        .vector_store(Arc::new(BrokenVectorStore))
        .embedding_provider(Arc::new(HashEmbedder::new()))
        .build()
        .unwrap();

    let err = manager.add_document("kb", DocumentInput::new("doc", SECTIONS)).await.unwrap_err();
    match err {
        KnowledgeError::StorageError { backend, message } => {
            assert_eq!(backend, "broken");
            assert!(message.contains("disk full"));
        }
        other => panic!("expected StorageError, got {other:?}"),
    }
    assert!(manager.list_documents("kb").await.unwrap().is_empty());
}

#[tokio::test]
async fn updates_document_status_and_metadata() {
    let manager = manager_with(None);
    let document = manager.add_document("kb", DocumentInput::new("doc", SECTIONS)).await.unwrap();

    let mut metadata = Metadata::new();
    metadata.insert("reviewed".into(), serde_json::Value::Bool(true));
    let updated = manager
        .update_document(
            "kb",
            &document.id,
            DocumentUpdate { status: Some(DocumentStatus::Ready), metadata: Some(metadata) },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, DocumentStatus::Ready);
    assert_eq!(updated.metadata["reviewed"], serde_json::Value::Bool(true));
    assert!(manager.update_document("kb", "missing", DocumentUpdate::default()).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingestion_is_consistent() {
    let manager = Arc::new(manager_with(Some(Arc::new(HashEmbedder::new()))));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let kb = if i % 2 == 0 { "kb-even" } else { "kb-odd" };
                manager.add_document(kb, DocumentInput::new(format!("doc {i}"), SECTIONS)).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for kb in ["kb-even", "kb-odd"] {
        assert_eq!(
            manager.get_stats(kb).await.unwrap(),
            KnowledgeBaseStats { document_count: 8, chunk_count: 24 }
        );
        for document in manager.list_documents(kb).await.unwrap() {
            let chunks = manager.get_chunks(kb, &document.id).await.unwrap();
            let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
            assert_eq!(indices, [0, 1, 2]);
        }
    }
}

#[test]
fn invalid_chunk_config_is_rejected_at_build() {
    let mut bad = KnowledgeConfig::default();
    bad.chunk.chunk_overlap = bad.chunk.chunk_size;
    assert!(matches!(
        KnowledgeManager::builder().config(bad).build(),
        Err(KnowledgeError::ConfigError(_))
    ));
}
