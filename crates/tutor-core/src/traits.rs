use crate::types::{DocumentRecord, Neighbor, ScoredResult};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::Upstream("embedder returned no vector".into()).into())
    }
}

/// Persistent nearest-neighbour index over embedded records.
///
/// `nearest` orders by ascending distance; metadata must round-trip unchanged.
pub trait VectorStore: Send + Sync {
    fn insert(&self, records: &[DocumentRecord], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;
    fn nearest(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<Neighbor>>;
    fn all_documents(&self) -> anyhow::Result<Vec<DocumentRecord>>;
    fn count(&self) -> anyhow::Result<usize>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Dense side of hybrid retrieval, as seen by the orchestrator.
pub trait DenseSearch: Send + Sync {
    /// Best-first by distance; `score` is the raw distance.
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<ScoredResult>>;
    /// Never fails: an unavailable store yields an empty corpus.
    fn all_documents(&self) -> Vec<DocumentRecord>;
}
