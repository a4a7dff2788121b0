//! Dense Index Adapter: embedder + vector store behind `DenseSearch`.

use anyhow::Result;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use tutor_core::traits::{DenseSearch, Embedder, VectorStore};
use tutor_core::types::{DocumentRecord, Origin, ScoredResult};

pub struct DenseIndex<S: VectorStore> {
	embedder: Box<dyn Embedder>,
	store: S,
}

impl<S: VectorStore> DenseIndex<S> {
	pub fn new(embedder: Box<dyn Embedder>, store: S) -> Self { Self { embedder, store } }

	pub fn store(&self) -> &S { &self.store }

	pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }

	/// Embed `records` in batches of `batch_size` and insert them.
	/// Returns the number of rows written.
	pub fn add_documents(&self, records: &[DocumentRecord], batch_size: usize, progress: Option<&ProgressBar>) -> Result<usize> {
		let mut written = 0usize;
		for batch in records.chunks(batch_size.max(1)) {
			let texts: Vec<String> = batch.iter().map(|r| r.content.clone()).collect();
			let embeddings = self.embedder.embed_batch(&texts)?;
			self.store.insert(batch, &embeddings)?;
			written += batch.len();
			if let Some(pb) = progress { pb.inc(batch.len() as u64); }
		}
		info!(rows = written, "added documents to dense index");
		Ok(written)
	}
}

impl<S: VectorStore> DenseSearch for DenseIndex<S> {
	fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
		if top_k == 0 { return Ok(vec![]); }
		let query_vec = self.embedder.embed(query)?;
		let hits = self.store.nearest(&query_vec, top_k)?;
		debug!(query, hits = hits.len(), "dense search");
		Ok(hits.into_iter().map(|n| ScoredResult::from_record(&n.record, n.distance, Origin::Dense)).collect())
	}

	fn all_documents(&self) -> Vec<DocumentRecord> {
		match self.store.all_documents() {
			Ok(docs) => docs,
			Err(e) => {
				warn!(error = %e, "vector store unavailable; treating corpus as empty");
				Vec::new()
			}
		}
	}
}
