//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SeparatorChunker`], which
//! splits text on a separator, packs the parts into chunks of at most
//! `chunk_size` characters, and carries `chunk_overlap` characters from the
//! end of each chunk into the next. Parts longer than `chunk_size` are cut on
//! raw character offsets.
//!
//! Lengths and offsets are counted in `char`s, never bytes, so multi-byte
//! text is never split inside a code point.

use serde_json::Value;
use uuid::Uuid;

use crate::config::ChunkConfig;
use crate::document::{Chunk, Document, Metadata};
use crate::error::{KnowledgeError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with content and metadata but no
/// embeddings. Embeddings are attached later by the manager.
pub trait Chunker: Send + Sync {
    /// Split a document into ordered chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace content.
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Splits text at a separator and packs the parts into overlapping chunks.
///
/// Each chunk gets a fresh UUID, a zero-based `index` in emission order,
/// trimmed content, and `chunk_size` / `chunk_index` metadata.
///
/// # Example
///
/// ```rust,ignore
/// use agent_platform_knowledge::{ChunkConfig, SeparatorChunker};
///
/// let chunker = SeparatorChunker::new(ChunkConfig::new(512, 64, "\n\n")?);
/// let chunks = chunker.chunk(&document)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SeparatorChunker {
    config: ChunkConfig,
}

impl SeparatorChunker {
    /// Create a new `SeparatorChunker`.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Return the chunking parameters.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split raw text into chunk strings, before IDs and metadata are attached.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::ChunkingError`] if `chunk_overlap >= chunk_size`
    /// or `chunk_size == 0`, which would otherwise never make progress.
    pub fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let ChunkConfig { chunk_size, chunk_overlap, separator } = &self.config;
        let (size, overlap) = (*chunk_size, *chunk_overlap);
        if size == 0 || overlap >= size {
            return Err(KnowledgeError::ChunkingError(format!(
                "chunk_overlap ({overlap}) must be less than chunk_size ({size})"
            )));
        }

        let mut pieces = Vec::new();
        let mut buffer = String::new();

        for part in text.split(separator.as_str()).map(str::trim).filter(|p| !p.is_empty()) {
            if !buffer.is_empty() && char_len(&buffer) + char_len(part) > size {
                let seed = if overlap > 0 && char_len(&buffer) > overlap {
                    tail(&buffer, overlap).to_string()
                } else {
                    String::new()
                };
                pieces.push(std::mem::replace(&mut buffer, seed));
            }

            if !buffer.is_empty() {
                buffer.push_str(separator);
            }
            buffer.push_str(part);

            // A single part larger than the chunk size is cut on raw offsets.
            while char_len(&buffer) > size {
                let head_end = byte_offset(&buffer, size);
                let rest_start = byte_offset(&buffer, size - overlap);
                pieces.push(buffer[..head_end].to_string());
                buffer = buffer[rest_start..].to_string();
            }
        }

        if !buffer.is_empty() {
            pieces.push(buffer);
        }

        Ok(pieces
            .into_iter()
            .map(|piece| piece.trim().to_string())
            .filter(|piece| !piece.is_empty())
            .collect())
    }
}

impl Chunker for SeparatorChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        let pieces = self.split_text(&document.content)?;

        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let mut metadata = Metadata::new();
                metadata.insert("chunk_size".to_string(), Value::from(char_len(&content)));
                metadata.insert("chunk_index".to_string(), Value::from(index));
                Chunk {
                    id: Uuid::new_v4().to_string(),
                    document_id: document.id.clone(),
                    content,
                    index,
                    metadata,
                    embedding: None,
                }
            })
            .collect())
    }
}

/// Chunk raw text with the default separator and return only the chunk contents.
///
/// # Errors
///
/// Returns [`KnowledgeError::ChunkingError`] if `overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let config = ChunkConfig { chunk_size, chunk_overlap: overlap, ..ChunkConfig::default() };
    SeparatorChunker::new(config).split_text(text)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `n`-th character, or `s.len()` past the end.
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(offset, _)| offset)
}

/// The last `n` characters of `s`.
fn tail(s: &str, n: usize) -> &str {
    let len = char_len(s);
    &s[byte_offset(s, len.saturating_sub(n))..]
}
