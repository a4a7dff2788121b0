//! Reciprocal rank fusion of a lexical and a dense ranking.

use std::collections::HashMap;

use tracing::warn;

use tutor_core::config::RetrievalSettings;
use tutor_core::types::ScoredResult;

#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Smoothing constant: rank `r` contributes `1 / (k + r + 1)`.
    pub k: usize,
    /// Key results lacking identifier and path by a hash of their content
    /// instead of the shared empty key.
    pub content_hash_keys: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { k: 60, content_hash_keys: false }
    }
}

impl From<&RetrievalSettings> for FusionConfig {
    fn from(s: &RetrievalSettings) -> Self {
        Self { k: s.rrf_k, content_hash_keys: s.content_hash_keys }
    }
}

/// Document identity used to merge the two rankings.
pub fn fusion_key(result: &ScoredResult, content_hash_keys: bool) -> String {
    if let Some(id) = &result.meta.identifier {
        return id.clone();
    }
    if !result.meta.filepath.is_empty() {
        return result.meta.filepath.clone();
    }
    if content_hash_keys {
        return format!("blake3:{}", blake3::hash(result.content.as_bytes()).to_hex());
    }
    String::new()
}

struct Entry {
    representative: ScoredResult,
    score: f64,
}

/// Merge `lexical` and `dense` (each best-first) into at most `top_k`
/// results ordered by summed reciprocal rank.
///
/// The first occurrence of a document is kept as its representative with
/// `score` replaced by the fused sum. Equal sums keep first-seen order,
/// lexical entries before dense ones.
pub fn reciprocal_rank_fusion(lexical: &[ScoredResult], dense: &[ScoredResult], top_k: usize, cfg: &FusionConfig) -> Vec<ScoredResult> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut table: Vec<Entry> = Vec::new();

    for list in [lexical, dense] {
        for (rank, result) in list.iter().enumerate() {
            let contribution = 1.0 / (cfg.k as f64 + rank as f64 + 1.0);
            let key = fusion_key(result, cfg.content_hash_keys);
            match slots.get(&key) {
                Some(&slot) => {
                    if key.is_empty() {
                        warn!(origin = %result.origin, rank, "result without identifier or path merged into shared fusion entry");
                    }
                    table[slot].score += contribution;
                }
                None => {
                    slots.insert(key, table.len());
                    table.push(Entry { representative: result.clone(), score: contribution });
                }
            }
        }
    }

    table.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    table
        .into_iter()
        .take(top_k)
        .map(|e| {
            let mut r = e.representative;
            r.score = e.score as f32;
            r
        })
        .collect()
}
