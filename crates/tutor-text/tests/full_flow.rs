use tutor_core::config::LexicalSettings;
use tutor_core::types::{DocumentMeta, DocumentRecord, Origin};
use tutor_text::LexicalIndex;

fn doc(id: &str, content: &str) -> DocumentRecord {
    DocumentRecord::new(content, DocumentMeta { filename: format!("{id}.txt"), filepath: format!("/course/{id}.txt"), ..Default::default() }.with_identifier(id))
}

fn course_corpus() -> Vec<DocumentRecord> {
    vec![
        doc("la1", "Linear algebra studies vectors, matrices and linear maps."),
        doc("la2", "Matrix multiplication composes linear maps; the matrix product is associative."),
        doc("pr1", "Probability theory: random variables, expectation and Bayes theorem."),
        doc("os1", "Operating systems schedule processes and manage virtual memory."),
    ]
}

#[test]
fn chinese_query_matches_whole_word() {
    let corpus = vec![doc("d1", "线性代数介绍 矩阵乘法"), doc("d2", "概率论基础 贝叶斯定理")];
    let index = LexicalIndex::build(&corpus, &LexicalSettings::default()).expect("build");
    let hits = index.search("矩阵", 5).unwrap();
    assert_eq!(hits.len(), 1, "hits: {hits:?}");
    assert_eq!(hits[0].meta.identifier.as_deref(), Some("d1"));
    assert!(hits[0].score > 0.0);
    assert_eq!(hits[0].origin, Origin::Lexical);
}

#[test]
fn no_result_without_term_overlap() {
    let index = LexicalIndex::build(&course_corpus(), &LexicalSettings::default()).expect("build");
    for q in ["matrix", "memory processes", "bayes expectation", "quantum chromodynamics"] {
        let hits = index.search(q, 10).unwrap();
        for h in &hits {
            assert!(h.score > 0.0, "q='{q}' returned non-positive score");
        }
        let scores = index.scores(q).unwrap();
        let positive = scores.iter().filter(|&&s| s > 0.0).count();
        assert_eq!(hits.len(), positive.min(10), "q='{q}'");
    }
    assert!(index.search("quantum chromodynamics", 10).unwrap().is_empty());
    let ids: Vec<_> = index.search("matrix", 10).unwrap().into_iter().filter_map(|h| h.meta.identifier).collect();
    assert_eq!(ids, vec!["la2".to_string()]);
}

#[test]
fn results_are_sorted_and_truncated() {
    let index = LexicalIndex::build(&course_corpus(), &LexicalSettings::default()).expect("build");
    let hits = index.search("linear maps matrix", 10).unwrap();
    assert!(hits.len() >= 2);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(index.search("linear maps matrix", 1).unwrap().len(), 1);
    assert!(index.search("linear maps matrix", 0).unwrap().is_empty());
}

#[test]
fn empty_query_and_empty_index_return_nothing() {
    let index = LexicalIndex::build(&course_corpus(), &LexicalSettings::default()).expect("build");
    assert!(index.search("", 5).unwrap().is_empty());
    assert!(index.search("the and of", 5).unwrap().is_empty(), "stop words alone never match");

    let empty = LexicalIndex::build(&[], &LexicalSettings::default()).expect("empty corpus is not an error");
    assert!(empty.is_empty());
    assert!(empty.search("matrix", 5).unwrap().is_empty());
}

#[test]
fn rebuild_with_same_corpus_is_idempotent() {
    let corpus = course_corpus();
    let first = LexicalIndex::build(&corpus, &LexicalSettings::default()).expect("build");
    let second = LexicalIndex::build(&corpus, &LexicalSettings::default()).expect("rebuild");
    for q in ["linear", "matrix product", "virtual memory", "bayes"] {
        assert_eq!(first.search(q, 3).unwrap(), second.search(q, 3).unwrap(), "q='{q}'");
    }
}
