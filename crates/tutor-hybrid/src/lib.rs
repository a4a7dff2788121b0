//! Hybrid retrieval: lexical BM25 and dense vectors merged by reciprocal
//! rank fusion, plus rendering of the retrieved context.
pub mod context;
pub mod fusion;
pub mod retriever;

pub use fusion::{reciprocal_rank_fusion, FusionConfig};
pub use retriever::HybridRetriever;
