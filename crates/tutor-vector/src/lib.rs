//! Vector storage for course material.
//!
//! `LanceStore` persists embedded chunks in a LanceDB table, `MemoryStore`
//! keeps them in process, and `DenseIndex` wraps either one with an
//! embedder to answer text queries.
pub mod dense;
pub mod lance;
pub mod memory;
pub mod schema;

pub use dense::DenseIndex;
pub use lance::LanceStore;
pub use memory::MemoryStore;
