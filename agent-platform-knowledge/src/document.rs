//! Data types for documents, chunks, and search results.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form, unordered key-value metadata.
pub type Metadata = HashMap<String, serde_json::Value>;

/// The format of a document's raw content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    /// Plain text.
    #[default]
    Text,
    /// Markdown.
    Markdown,
    /// HTML.
    Html,
    /// Text extracted from a PDF.
    Pdf,
    /// Any other caller-defined format.
    Other(String),
}

impl ContentType {
    /// Return the canonical string form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Other(other) => other,
        }
    }

    /// Guess the content type from a file extension.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Self::Markdown,
            "html" | "htm" => Self::Html,
            "pdf" => Self::Pdf,
            "txt" | "text" | "" => Self::Text,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "text" | "plain" | "text/plain" => Self::Text,
            "markdown" | "md" | "text/markdown" => Self::Markdown,
            "html" | "text/html" => Self::Html,
            "pdf" | "application/pdf" => Self::Pdf,
            _ => Self::Other(value),
        }
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for ContentType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

/// Ingestion state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Chunks exist but their vectors have not been stored yet.
    #[default]
    Processing,
    /// Every chunk of the document is searchable.
    Ready,
}

/// A source document owned by a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// The raw text content.
    pub content: String,
    /// Format of `content`.
    pub content_type: ContentType,
    /// File path or URL the document came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
    /// When ingestion started.
    pub uploaded_at: DateTime<Utc>,
    /// Number of chunks produced by the chunker.
    pub chunk_count: usize,
    /// Whether the document's vectors are stored.
    #[serde(default)]
    pub status: DocumentStatus,
}

/// The caller-supplied part of a new [`Document`].
///
/// # Example
///
/// ```rust,ignore
/// let input = DocumentInput::new("Onboarding", text)
///     .with_content_type(ContentType::Markdown)
///     .with_source("docs/onboarding.md");
/// let document = manager.add_document("kb-1", input).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInput {
    /// Human-readable title.
    pub title: String,
    /// The raw text content.
    pub content: String,
    /// Format of `content`.
    pub content_type: ContentType,
    /// File path or URL the document came from.
    pub source: Option<String>,
    /// Key-value metadata associated with the document.
    pub metadata: Metadata,
}

impl DocumentInput {
    /// Create an input with a title and plain-text content.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into(), ..Default::default() }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the source descriptor.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Insert a metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A typed partial update of the caller-maintained fields of a [`Document`].
///
/// `None` fields are left untouched. Metadata entries are merged into the
/// existing map; content and chunks are never updated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    /// New ingestion status.
    pub status: Option<DocumentStatus>,
    /// Metadata entries to insert or overwrite.
    pub metadata: Option<Metadata>,
}

impl DocumentUpdate {
    /// Apply this update to a document.
    pub fn apply(self, document: &mut Document) {
        if let Some(status) = self.status {
            document.status = status;
        }
        if let Some(metadata) = self.metadata {
            document.metadata.extend(metadata);
        }
    }
}

/// A bounded, trimmed segment of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The trimmed text content of the chunk.
    pub content: String,
    /// Zero-based position of the chunk within its document.
    pub index: usize,
    /// Chunk-specific metadata (at least `chunk_size` and `chunk_index`).
    #[serde(default)]
    pub metadata: Metadata,
    /// The vector embedding, absent until the embedding step runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
    /// The ID of the document the chunk belongs to.
    pub document_id: String,
}

/// Document and vector counts for a knowledge base.
///
/// The two counts diverge when some documents were ingested without vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    /// Number of documents in the document store.
    pub document_count: usize,
    /// Number of chunks in the vector store.
    pub chunk_count: usize,
}
