use std::sync::Mutex;

use anyhow::Result;

use tutor_core::config::{LexicalSettings, RetrievalSettings};
use tutor_core::error::Error;
use tutor_core::traits::DenseSearch;
use tutor_core::types::{DocumentMeta, DocumentRecord, Origin, ScoredResult};
use tutor_embed::FakeEmbedder;
use tutor_hybrid::{reciprocal_rank_fusion, FusionConfig, HybridRetriever};
use tutor_vector::{DenseIndex, MemoryStore};

fn doc(id: &str, content: &str) -> DocumentRecord {
    DocumentRecord::new(content, DocumentMeta { filepath: format!("{}.txt", id), ..DocumentMeta::default() }.with_identifier(id))
}

fn hit(id: &str, score: f32, origin: Origin) -> ScoredResult {
    ScoredResult::from_record(&doc(id, id), score, origin)
}

fn ids(results: &[ScoredResult]) -> Vec<String> {
    results.iter().map(|r| r.meta.identifier.clone().unwrap_or_default()).collect()
}

/// Dense side with canned answers; remembers the `top_k` of each call.
struct ScriptedDense {
    ranking: Vec<ScoredResult>,
    corpus: Vec<DocumentRecord>,
    fail: bool,
    requested: Mutex<Vec<usize>>,
}

impl ScriptedDense {
    fn new(ranking: Vec<ScoredResult>, corpus: Vec<DocumentRecord>) -> Self {
        Self { ranking, corpus, fail: false, requested: Mutex::new(Vec::new()) }
    }
}

impl DenseSearch for ScriptedDense {
    fn search(&self, _query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        self.requested.lock().unwrap().push(top_k);
        if self.fail {
            return Err(Error::Upstream("embedding service timed out".into()).into());
        }
        Ok(self.ranking.iter().take(top_k).cloned().collect())
    }

    fn all_documents(&self) -> Vec<DocumentRecord> { self.corpus.clone() }
}

#[test]
fn fused_scores_tie_and_keep_lexical_order() {
    let lexical = vec![hit("d1", 3.0, Origin::Lexical), hit("d2", 1.0, Origin::Lexical)];
    let dense = vec![hit("d2", 0.1, Origin::Dense), hit("d1", 0.4, Origin::Dense)];
    let fused = reciprocal_rank_fusion(&lexical, &dense, 5, &FusionConfig::default());

    assert_eq!(ids(&fused), vec!["d1", "d2"]);
    let expected = (1.0 / 61.0 + 1.0 / 62.0) as f32;
    assert!((fused[0].score - expected).abs() < 1e-6);
    assert!((fused[0].score - 0.03252).abs() < 1e-4);
    assert_eq!(fused[0].score, fused[1].score);
    // representatives come from the lexical list
    assert!(fused.iter().all(|r| r.origin == Origin::Lexical));
}

#[test]
fn agreement_outranks_single_list_hits() {
    let lexical = vec![hit("a", 5.0, Origin::Lexical), hit("shared", 4.0, Origin::Lexical)];
    let dense = vec![hit("b", 0.1, Origin::Dense), hit("shared", 0.2, Origin::Dense)];
    let fused = reciprocal_rank_fusion(&lexical, &dense, 10, &FusionConfig::default());

    assert_eq!(fused[0].meta.identifier.as_deref(), Some("shared"));
    let single = fused.iter().find(|r| r.meta.identifier.as_deref() == Some("a")).unwrap();
    assert!(fused[0].score > single.score);
}

#[test]
fn equal_scores_follow_insertion_order() {
    let lexical = vec![hit("x", 1.0, Origin::Lexical)];
    let dense = vec![hit("y", 0.5, Origin::Dense)];
    let fused = reciprocal_rank_fusion(&lexical, &dense, 10, &FusionConfig::default());
    assert_eq!(ids(&fused), vec!["x", "y"]);
    assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn output_is_truncated_to_top_k() {
    let lexical: Vec<_> = (0..8).map(|i| hit(&format!("l{}", i), 1.0, Origin::Lexical)).collect();
    let dense: Vec<_> = (0..8).map(|i| hit(&format!("v{}", i), 0.1, Origin::Dense)).collect();
    assert_eq!(reciprocal_rank_fusion(&lexical, &dense, 3, &FusionConfig::default()).len(), 3);
    assert!(reciprocal_rank_fusion(&lexical, &dense, 0, &FusionConfig::default()).is_empty());
}

#[test]
fn smoothing_constant_is_configurable() {
    let cfg = FusionConfig { k: 0, ..FusionConfig::default() };
    let fused = reciprocal_rank_fusion(&[hit("d1", 1.0, Origin::Lexical)], &[], 1, &cfg);
    assert!((fused[0].score - 1.0).abs() < 1e-6);
}

#[test]
fn unbuilt_retriever_matches_dense_only() {
    let ranking = vec![hit("d2", 0.12, Origin::Dense), hit("d1", 0.47, Origin::Dense), hit("d3", 0.9, Origin::Dense)];
    let retriever = HybridRetriever::new(ScriptedDense::new(ranking, vec![]), RetrievalSettings::default(), LexicalSettings::default());

    assert!(!retriever.is_ready());
    let hybrid = retriever.hybrid_search("anything", 2).unwrap();
    let direct = retriever.vector_search("anything", 2).unwrap();
    assert_eq!(hybrid, direct);
    assert_eq!(hybrid[0].score, 0.12);
}

#[test]
fn built_retriever_overfetches_and_fuses() {
    let corpus = vec![doc("d1", "线性代数介绍 矩阵乘法"), doc("d2", "概率论基础 贝叶斯定理")];
    let ranking = vec![hit("d2", 0.2, Origin::Dense), hit("d1", 0.3, Origin::Dense)];
    let retriever = HybridRetriever::new(ScriptedDense::new(ranking, corpus.clone()), RetrievalSettings::default(), LexicalSettings::default());
    retriever.build_index(&corpus).unwrap();
    assert!(retriever.is_ready());

    let fused = retriever.query("矩阵", 3).unwrap();
    assert_eq!(*retriever.dense().requested.lock().unwrap(), vec![6]);
    // d1: lexical rank 0 + dense rank 1; d2: dense rank 0 only
    assert_eq!(ids(&fused), vec!["d1", "d2"]);
    assert_eq!(fused[0].origin, Origin::Lexical);
    assert!(fused.len() <= 3);
}

#[test]
fn empty_corpus_still_switches_to_fusion() {
    let ranking = vec![hit("d1", 0.3, Origin::Dense)];
    let retriever = HybridRetriever::new(ScriptedDense::new(ranking, vec![]), RetrievalSettings::default(), LexicalSettings::default());
    retriever.build_index(&[]).unwrap();
    assert!(retriever.is_ready());

    let fused = retriever.query("q", 5).unwrap();
    assert_eq!(ids(&fused), vec!["d1"]);
    assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-6);
}

#[test]
fn upstream_failure_surfaces_in_both_states() {
    let mut dense = ScriptedDense::new(vec![], vec![doc("d1", "matrix")]);
    dense.fail = true;
    let retriever = HybridRetriever::new(dense, RetrievalSettings::default(), LexicalSettings::default());

    let err = retriever.hybrid_search("matrix", 3).unwrap_err();
    assert!(err.downcast_ref::<Error>().is_some_and(Error::is_upstream));

    retriever.rebuild_from_dense().unwrap();
    let err = retriever.hybrid_search("matrix", 3).unwrap_err();
    assert!(err.downcast_ref::<Error>().is_some_and(Error::is_upstream));
}

#[test]
fn failed_build_leaves_retriever_unready() {
    let bad = LexicalSettings { writer_memory_bytes: 1024 };
    let retriever = HybridRetriever::new(ScriptedDense::new(vec![], vec![]), RetrievalSettings::default(), bad);
    let err = retriever.build_index(&[doc("d1", "matrix")]).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(!retriever.is_ready());
}

#[test]
fn rebuild_reads_corpus_from_dense_store() {
    let corpus = vec![doc("d1", "eigenvalues of a matrix"), doc("d2", "bayes theorem")];
    let retriever = HybridRetriever::new(ScriptedDense::new(vec![], corpus), RetrievalSettings::default(), LexicalSettings::default());
    assert_eq!(retriever.rebuild_from_dense().unwrap(), 2);

    let first = retriever.query("matrix", 5).unwrap();
    retriever.rebuild_from_dense().unwrap();
    assert_eq!(retriever.query("matrix", 5).unwrap(), first);
    assert_eq!(ids(&first), vec!["d1"]);
}

#[test]
fn end_to_end_with_memory_store() {
    let dense = DenseIndex::new(Box::new(FakeEmbedder::new(256)), MemoryStore::new());
    let corpus = vec![doc("d1", "线性代数介绍 矩阵乘法"), doc("d2", "概率论基础 贝叶斯定理")];
    dense.add_documents(&corpus, 8, None).unwrap();

    let retriever = HybridRetriever::new(dense, RetrievalSettings::default(), LexicalSettings::default());
    assert_eq!(retriever.rebuild_from_dense().unwrap(), 2);
    let fused = retriever.hybrid_search("矩阵", 5).unwrap();
    assert_eq!(fused[0].meta.identifier.as_deref(), Some("d1"));
    assert!(fused.len() <= 2);
}
