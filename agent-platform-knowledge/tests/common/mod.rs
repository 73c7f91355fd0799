//! Shared test doubles for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use agent_platform_knowledge::{EmbeddingProvider, KnowledgeError, Result};
use async_trait::async_trait;

/// Dimension of [`HashEmbedder`] vectors.
pub const HASH_DIM: usize = 8;

/// Deterministic embedder: the same text always maps to the same vector.
#[derive(Debug, Default)]
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; HASH_DIM];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % HASH_DIM] += f32::from(byte) / 255.0;
        }
        vector[0] += 1.0;
        Ok(vector)
    }
}

/// Embedder that always fails.
#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(KnowledgeError::embedding("failing", "service unavailable"))
    }
}

/// Embedder with hand-picked vectors per text, for exact similarity setups.
///
/// Texts without a registered vector embed to `fallback`.
#[derive(Debug)]
pub struct KeyedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl KeyedEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self { vectors: HashMap::new(), fallback }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for KeyedEmbedder {
    fn name(&self) -> &str {
        "keyed"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Unit vector at `angle` radians in the plane.
pub fn unit(angle: f32) -> Vec<f32> {
    vec![angle.cos(), angle.sin()]
}
