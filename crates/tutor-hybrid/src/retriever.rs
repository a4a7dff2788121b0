use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use tutor_core::config::{LexicalSettings, RetrievalSettings};
use tutor_core::traits::DenseSearch;
use tutor_core::types::{DocumentRecord, ScoredResult};
use tutor_text::LexicalIndex;

use crate::fusion::{reciprocal_rank_fusion, FusionConfig};

/// Lexical + dense retrieval over one corpus.
///
/// Until a lexical index has been built every query goes to the dense side
/// alone and keeps raw distances as scores. Once built, both sides are
/// over-fetched and merged by reciprocal rank fusion.
pub struct HybridRetriever<D: DenseSearch> {
    dense: D,
    lexical: RwLock<Option<Arc<LexicalIndex>>>,
    build_lock: Mutex<()>,
    settings: RetrievalSettings,
    lexical_settings: LexicalSettings,
    fusion: FusionConfig,
}

impl<D: DenseSearch> HybridRetriever<D> {
    pub fn new(dense: D, settings: RetrievalSettings, lexical_settings: LexicalSettings) -> Self {
        let fusion = FusionConfig::from(&settings);
        Self { dense, lexical: RwLock::new(None), build_lock: Mutex::new(()), settings, lexical_settings, fusion }
    }

    pub fn dense(&self) -> &D { &self.dense }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    /// Whether a lexical index is installed.
    pub fn is_ready(&self) -> bool { self.lexical.read().is_some() }

    /// Replace the lexical index with one built from `corpus`.
    ///
    /// The new index is built without holding the read lock, so queries keep
    /// using the previous snapshot until the swap. A failed build leaves the
    /// retriever without a lexical index.
    pub fn build_index(&self, corpus: &[DocumentRecord]) -> tutor_core::error::Result<()> {
        let _writer = self.build_lock.lock();
        match LexicalIndex::build(corpus, &self.lexical_settings) {
            Ok(index) => {
                let size = index.len();
                *self.lexical.write() = Some(Arc::new(index));
                info!(documents = size, "lexical index installed");
                Ok(())
            }
            Err(e) => {
                *self.lexical.write() = None;
                warn!(error = %e, "lexical index build failed; dense-only until rebuilt");
                Err(e)
            }
        }
    }

    /// Rebuild the lexical index from everything the dense store holds.
    /// Returns the number of records read.
    pub fn rebuild_from_dense(&self) -> tutor_core::error::Result<usize> {
        let corpus = self.dense.all_documents();
        self.build_index(&corpus)?;
        Ok(corpus.len())
    }

    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        let snapshot = self.lexical.read().clone();
        let Some(index) = snapshot else {
            debug!("no lexical index; dense-only query");
            return self.dense.search(text, top_k);
        };
        let fetch = top_k.saturating_mul(self.settings.overfetch);
        let lexical = index.search(text, fetch)?;
        let dense = self.dense.search(text, fetch)?;
        let fused = reciprocal_rank_fusion(&lexical, &dense, top_k, &self.fusion);
        debug!(lexical = lexical.len(), dense = dense.len(), fused = fused.len(), "hybrid query");
        Ok(fused)
    }

    pub fn hybrid_search(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>> { self.query(text, top_k) }

    /// Dense-only search regardless of state.
    pub fn vector_search(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>> { self.dense.search(text, top_k) }
}
