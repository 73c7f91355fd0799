//! pgvector backend tests. They need a PostgreSQL server with the `vector`
//! extension and are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/kb_test cargo test --features pgvector -- --ignored
//! ```
#![cfg(feature = "pgvector")]

use agent_platform_knowledge::document::{Chunk, Metadata};
use agent_platform_knowledge::{InMemoryVectorStore, PgVectorStore, VectorStore};
use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::TestRunner;
use uuid::Uuid;

const DIM: usize = 4;

async fn store() -> PgVectorStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for pgvector tests");
    let pool = sqlx::PgPool::connect(&url).await.unwrap();
    let table = format!("kb_test_{}", Uuid::new_v4().simple());
    let store = PgVectorStore::from_pool(pool).with_table(&table).unwrap().with_dimensions(DIM);
    store.ensure_schema().await.unwrap();
    store
}

fn chunk(id: &str, document_id: &str, index: usize, embedding: Option<Vec<f32>>) -> Chunk {
    let mut metadata = Metadata::new();
    metadata.insert("chunk_index".into(), index.into());
    Chunk {
        id: id.into(),
        document_id: document_id.into(),
        content: format!("content of {id}"),
        index,
        metadata,
        embedding,
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with pgvector"]
async fn stores_searches_and_deletes() {
    let store = store().await;
    store
        .add_chunks(
            "kb",
            &[
                chunk("a", "d1", 0, Some(vec![1.0, 0.0, 0.0, 0.0])),
                chunk("b", "d1", 1, Some(vec![0.0, 1.0, 0.0, 0.0])),
                chunk("c", "d2", 0, Some(vec![1.0, 0.1, 0.0, 0.0])),
                chunk("d", "d2", 1, None),
            ],
        )
        .await
        .unwrap();
    let other = [chunk("e", "d3", 0, Some(vec![1.0, 0.0, 0.0, 0.0]))];
    store.add_chunks("other", &other).await.unwrap();
    assert_eq!(store.chunk_count("kb").await.unwrap(), 4);

    let results = store.search("kb", &[1.0, 0.0, 0.0, 0.0], 10, 0.5).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, ["a", "c"]);
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[1].document_id, "d2");
    assert_eq!(results[1].chunk.metadata["chunk_index"], 0);
    assert_eq!(results[1].chunk.embedding.as_deref(), Some(&[1.0, 0.1, 0.0, 0.0][..]));

    store.delete_document("kb", "d1").await.unwrap();
    assert_eq!(store.chunk_count("kb").await.unwrap(), 2);

    store.delete_knowledge_base("kb").await.unwrap();
    assert_eq!(store.chunk_count("kb").await.unwrap(), 0);
    assert_eq!(store.chunk_count("other").await.unwrap(), 1);
    assert!(store.search("kb", &[1.0, 0.0, 0.0, 0.0], 10, -1.0).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with pgvector"]
async fn ties_keep_insertion_order() {
    let store = store().await;
    store
        .add_chunks(
            "kb",
            &[
                chunk("first", "d", 0, Some(vec![1.0, 0.0, 0.0, 0.0])),
                chunk("second", "d", 1, Some(vec![2.0, 0.0, 0.0, 0.0])),
                chunk("third", "d", 2, Some(vec![3.0, 0.0, 0.0, 0.0])),
            ],
        )
        .await
        .unwrap();

    let results = store.search("kb", &[1.0, 0.0, 0.0, 0.0], 3, 0.0).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, ["first", "second", "third"]);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with pgvector"]
async fn zero_vectors_score_zero_like_in_memory() {
    let pg = store().await;
    let memory = InMemoryVectorStore::new();
    let chunks = [
        chunk("zero", "d", 0, Some(vec![0.0; DIM])),
        chunk("unit", "d", 1, Some(vec![1.0, 0.0, 0.0, 0.0])),
    ];
    pg.add_chunks("kb", &chunks).await.unwrap();
    memory.add_chunks("kb", &chunks).await.unwrap();

    // A zero query never clears a positive threshold.
    assert!(pg.search("kb", &[0.0; DIM], 10, 0.7).await.unwrap().is_empty());
    assert!(memory.search("kb", &[0.0; DIM], 10, 0.7).await.unwrap().is_empty());

    let results = pg.search("kb", &[1.0, 0.0, 0.0, 0.0], 10, 0.5).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, ["unit"]);

    for query in [[0.0; DIM], [1.0, 0.0, 0.0, 0.0]] {
        let expected = memory.search("kb", &query, 10, 0.0).await.unwrap();
        let actual = pg.search("kb", &query, 10, 0.0).await.unwrap();
        let expected_ids: Vec<&str> = expected.iter().map(|r| r.chunk.id.as_str()).collect();
        let actual_ids: Vec<&str> = actual.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(actual_ids, expected_ids, "query {query:?}");
        for (e, a) in expected.iter().zip(&actual) {
            assert!(a.score.is_finite());
            assert!((e.score - a.score).abs() < 1e-5, "{} vs {}", e.score, a.score);
        }
    }
}

/// Both backends rank the same data identically.
#[tokio::test]
#[ignore = "requires DATABASE_URL with pgvector"]
async fn matches_in_memory_ranking() {
    let pg = store().await;
    let mut runner = TestRunner::deterministic();
    let vector = proptest::collection::vec(-1.0f32..1.0f32, DIM);

    for round in 0..10 {
        let kb = format!("kb-{round}");
        let memory = InMemoryVectorStore::new();
        let chunks: Vec<Chunk> = (0..12)
            .map(|i| {
                let embedding = vector.new_tree(&mut runner).unwrap().current();
                chunk(&format!("{kb}-{i}"), "d", i, Some(embedding))
            })
            .collect();
        let query = vector.new_tree(&mut runner).unwrap().current();

        memory.add_chunks(&kb, &chunks).await.unwrap();
        pg.add_chunks(&kb, &chunks).await.unwrap();

        let expected = memory.search(&kb, &query, 5, 0.1).await.unwrap();
        let actual = pg.search(&kb, &query, 5, 0.1).await.unwrap();

        let expected_ids: Vec<&str> = expected.iter().map(|r| r.chunk.id.as_str()).collect();
        let actual_ids: Vec<&str> = actual.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(actual_ids, expected_ids, "round {round}");
        for (e, a) in expected.iter().zip(&actual) {
            assert!((e.score - a.score).abs() < 1e-4, "round {round}: {} vs {}", e.score, a.score);
        }
    }
}
