//! Domain types shared by the lexical index, the vector stores and fusion.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Source metadata attached to every indexed unit of course material.
///
/// - `identifier`: unique within the corpus when present
/// - `filename`/`filepath`/`filetype`: where the text came from
/// - `page_number`: 1-based page or slide; `0` when the source is not paginated
/// - `chunk_id`: ordinal of the window within its page or file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub identifier: Option<ChunkId>,
    pub filename: String,
    pub filepath: String,
    pub filetype: String,
    pub page_number: u32,
    pub chunk_id: u32,
}

impl DocumentMeta {
    pub fn with_identifier(mut self, id: impl Into<ChunkId>) -> Self {
        self.identifier = Some(id.into());
        self
    }
}

/// One indexable unit of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub content: String,
    pub meta: DocumentMeta,
}

impl DocumentRecord {
    pub fn new(content: impl Into<String>, meta: DocumentMeta) -> Self {
        Self { content: content.into(), meta }
    }

    /// Identifier, falling back to the file path when absent.
    pub fn identifier(&self) -> &str {
        self.meta.identifier.as_deref().unwrap_or(&self.meta.filepath)
    }
}

/// Indicates which index produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Origin {
    Lexical,
    Dense,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Lexical => f.write_str("lexical"),
            Origin::Dense => f.write_str("dense"),
        }
    }
}

/// The result unit of both indexes and of fusion.
///
/// `score` is origin-specific and the scales are not comparable:
/// lexical scores are similarities (higher is better), dense scores are raw
/// distances (lower is better), fused scores are reciprocal-rank sums
/// (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub content: String,
    pub meta: DocumentMeta,
    pub score: f32,
    pub origin: Origin,
}

impl ScoredResult {
    pub fn from_record(record: &DocumentRecord, score: f32, origin: Origin) -> Self {
        Self { content: record.content.clone(), meta: record.meta.clone(), score, origin }
    }
}

/// A stored vector row returned by a k-nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub record: DocumentRecord,
    pub distance: f32,
}
