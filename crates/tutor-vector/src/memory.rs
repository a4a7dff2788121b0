//! In-memory `VectorStore` for tests and offline runs.
//!
//! Brute-force cosine distance over every stored vector.

use anyhow::Result;
use parking_lot::RwLock;

use tutor_core::error::Error;
use tutor_core::traits::VectorStore;
use tutor_core::types::{DocumentRecord, Neighbor};

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<(DocumentRecord, Vec<f32>)>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

/// `1 - cos(a, b)`; mismatched or zero vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        1.0
    } else {
        1.0 - dot / (mag_a * mag_b)
    }
}

impl VectorStore for MemoryStore {
    fn insert(&self, records: &[DocumentRecord], embeddings: &[Vec<f32>]) -> Result<()> {
        if records.len() != embeddings.len() {
            return Err(Error::Store(format!("{} records but {} embeddings", records.len(), embeddings.len())).into());
        }
        let mut rows = self.rows.write();
        let base = rows.len();
        for (i, (rec, emb)) in records.iter().zip(embeddings).enumerate() {
            let mut rec = rec.clone();
            if rec.meta.identifier.is_none() {
                rec.meta.identifier = Some(format!("doc_{}", base + i));
            }
            rows.push((rec, emb.clone()));
        }
        Ok(())
    }

    fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let rows = self.rows.read();
        let mut hits: Vec<Neighbor> = rows
            .iter()
            .map(|(rec, emb)| Neighbor { record: rec.clone(), distance: cosine_distance(query_vec, emb) })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    fn all_documents(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.rows.read().iter().map(|(rec, _)| rec.clone()).collect())
    }

    fn count(&self) -> Result<usize> { Ok(self.rows.read().len()) }

    fn clear(&self) -> Result<()> {
        self.rows.write().clear();
        Ok(())
    }
}
