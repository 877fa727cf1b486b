//! Core data types flowing through the retrieval pipeline.
//!
//! Offsets (`start`, `end`) are character offsets into the owning document's
//! raw text, `end` exclusive.

use serde::Serialize;

/// A contiguous slice of a document, the atomic unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// `c0`, `c1`, … assigned in offset order.
    pub id: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A [`Chunk`] with its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Cache identity of an index: exact equality on both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub document_id: String,
    pub version: String,
}

impl DocumentKey {
    pub fn new(document_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.document_id, self.version)
    }
}

/// The embedded chunks of one document version.
///
/// Immutable once built. All embeddings share one dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub document_id: String,
    pub version: String,
    pub chunks: Vec<EmbeddedChunk>,
}

impl Index {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.document_id.clone(), self.version.clone())
    }

    /// Embedding dimensionality, or `None` for an index with no chunks.
    pub fn dims(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding.len())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// A retrieval hit: a borrowed chunk plus its cosine similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a EmbeddedChunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

impl ScoredChunk<'_> {
    pub fn id(&self) -> &str {
        &self.chunk.chunk.id
    }

    pub fn start(&self) -> usize {
        self.chunk.chunk.start
    }

    pub fn end(&self) -> usize {
        self.chunk.chunk.end
    }

    pub fn text(&self) -> &str {
        &self.chunk.chunk.text
    }
}
