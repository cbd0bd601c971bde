//! docqa-text
//!
//! Tantivy-backed chunk index. Serves as both the storage collaborator
//! (`ChunkStore`) and the retrieval collaborator (`Retriever`).
pub mod index;
pub mod tantivy_utils;

pub use index::{ChunkIndex, IndexStats};
