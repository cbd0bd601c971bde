//! Extract, segment and store documents in one pass.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use docqa_core::traits::{ChunkStore, TextExtractor};
use docqa_core::{Chunker, Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: usize,
}

pub struct Ingestor<E, S> {
    extractor: E,
    chunker: Chunker,
    store: S,
}

impl<E: TextExtractor, S: ChunkStore> Ingestor<E, S> {
    pub fn new(extractor: E, chunker: Chunker, store: S) -> Self { Self { extractor, chunker, store } }

    pub fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> { self.ingest_paths_with(paths, |_| {}) }

    /// Like [`Ingestor::ingest_paths`], calling `on_file` after each path is
    /// processed. Files that fail extraction are counted as skipped; a storage
    /// failure aborts the whole batch.
    pub fn ingest_paths_with(&self, paths: &[PathBuf], mut on_file: impl FnMut(&Path)) -> Result<IngestReport> {
        let mut documents = Vec::with_capacity(paths.len());
        let mut skipped = 0;
        for path in paths {
            match self.extractor.extract(path) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping file");
                    skipped += 1;
                }
            }
            on_file(path);
        }
        let chunks = self.chunker.segment_many(&documents);
        let stored = if chunks.is_empty() {
            0
        } else {
            self.store.add(&chunks).map_err(|e| Error::Storage(format!("{e:#}")))?
        };
        let report = IngestReport { documents: documents.len(), chunks: stored, skipped };
        info!(documents = report.documents, chunks = report.chunks, skipped = report.skipped, "ingest complete");
        Ok(report)
    }
}
