//! Seams to the collaborators that live outside the core: text extraction,
//! chunk storage, similarity retrieval and answer generation.

use std::path::Path;

use crate::types::{Chunk, Document, Metadata, RetrievalResult};

pub trait TextExtractor: Send + Sync {
    fn extract(&self, source: &Path) -> crate::Result<Document>;
}

pub trait ChunkStore: Send + Sync {
    /// Append chunks and return how many were stored.
    fn add(&self, chunks: &[Chunk]) -> anyhow::Result<usize>;
}

pub trait Retriever: Send + Sync {
    /// Best-first matches for `query`. An empty vector means nothing is indexed
    /// (or nothing matched) and is not an error.
    fn search(&self, query: &str, top_k: usize, filter: Option<&Metadata>) -> anyhow::Result<Vec<RetrievalResult>>;
}

pub trait Generator: Send + Sync {
    fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String>;
}

impl<T: ChunkStore + ?Sized> ChunkStore for &T {
    fn add(&self, chunks: &[Chunk]) -> anyhow::Result<usize> { (**self).add(chunks) }
}

impl<T: Retriever + ?Sized> Retriever for &T {
    fn search(&self, query: &str, top_k: usize, filter: Option<&Metadata>) -> anyhow::Result<Vec<RetrievalResult>> { (**self).search(query, top_k, filter) }
}

impl<T: Generator + ?Sized> Generator for &T {
    fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String> { (**self).complete(system_prompt, user_message) }
}
