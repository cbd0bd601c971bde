//! docqa-core
//!
//! Domain types, the error taxonomy, collaborator traits, configuration and
//! the recursive text chunker shared by the index, the orchestrator and the CLI.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{ChunkStats, Chunker, ChunkerConfig};
pub use error::{Error, Result};
pub use types::{Chunk, Document, MetaValue, Metadata, RetrievalResult};
