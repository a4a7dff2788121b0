//! tutor-text
//!
//! Lexical side of hybrid retrieval: a jieba-segmented tantivy analyzer and an
//! in-memory Okapi BM25 index rebuilt wholesale from a corpus snapshot.

pub mod index;
pub mod tantivy_utils;

pub use index::LexicalIndex;
