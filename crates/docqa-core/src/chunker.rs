//! Recursive, separator-driven text chunking.
//!
//! Text is cut at the coarsest separator that brings every piece under the
//! budget (paragraphs, then lines, then sentences, then words, then single
//! characters). Adjacent pieces are merged greedily up to `chunk_size`, and
//! every chunk after the first starts with the tail of its predecessor.
//!
//! The descent over separators runs on an explicit work stack, so input with
//! no separators at all costs heap, not call depth.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Chunk, Document, Metadata};
use crate::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Paragraph, line, sentence, word, character.
pub fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ". ", " ", ""].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP, separators: default_separators() }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separators.is_empty() {
            return Err(Error::InvalidConfig("at least one separator is required".to_string()));
        }
        // Anything after the character-level separator could never be reached.
        if let Some(pos) = self.separators.iter().position(|s| s.is_empty()) {
            if pos != self.separators.len() - 1 {
                return Err(Error::InvalidConfig("the empty separator must be the last one".to_string()));
            }
        }
        Ok(())
    }
}

/// Summary over a chunk sequence. Everything but `total_chunks` is absent for
/// an empty sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_chunk_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_chunk_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_characters: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        info!(chunk_size = config.chunk_size, chunk_overlap = config.chunk_overlap, "initialized chunker");
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig { &self.config }

    /// Split `text` into chunks carrying `metadata` plus their position.
    /// Empty or whitespace-only text yields no chunks.
    pub fn segment(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        if text.trim().is_empty() {
            warn!("empty text provided for chunking");
            return Vec::new();
        }
        let pieces = self.split_pieces(text);
        let drafts = self.merge(text, &pieces);
        let total_chunks = drafts.len();
        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                let size = char_len(&draft.text);
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunk_index".to_string(), index.into());
                chunk_metadata.insert("total_chunks".to_string(), total_chunks.into());
                chunk_metadata.insert("chunk_size".to_string(), size.into());
                Chunk {
                    text: draft.text,
                    index,
                    total_chunks,
                    size,
                    overlap: draft.overlap,
                    oversized: size > self.config.chunk_size,
                    metadata: chunk_metadata,
                }
            })
            .collect();
        info!(chunks = total_chunks, "split text into chunks");
        chunks
    }

    /// Segment every document independently, tagging chunks with the
    /// document's position in `documents`.
    pub fn segment_many(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all_chunks = Vec::new();
        for (document_index, document) in documents.iter().enumerate() {
            let mut metadata = document.metadata.clone();
            metadata.insert("document_index".to_string(), document_index.into());
            all_chunks.extend(self.segment(&document.text, &metadata));
        }
        info!(documents = documents.len(), chunks = all_chunks.len(), "chunked documents");
        all_chunks
    }

    pub fn stats(chunks: &[Chunk]) -> ChunkStats {
        if chunks.is_empty() {
            return ChunkStats::default();
        }
        let sizes: Vec<usize> = chunks.iter().map(|c| char_len(&c.text)).collect();
        let total: usize = sizes.iter().sum();
        ChunkStats {
            total_chunks: chunks.len(),
            avg_chunk_size: Some(total as f64 / sizes.len() as f64),
            min_chunk_size: sizes.iter().min().copied(),
            max_chunk_size: sizes.iter().max().copied(),
            total_characters: Some(total),
        }
    }

    /// Cut `text` into contiguous pieces of at most `chunk_size - chunk_overlap`
    /// characters, keeping each separator attached to the piece it ends.
    /// A piece is only left larger when the separator list is exhausted.
    fn split_pieces(&self, text: &str) -> Vec<Span> {
        let limit = self.config.chunk_size - self.config.chunk_overlap;
        let separators = &self.config.separators;
        let mut pieces = Vec::new();
        // (start, end, separator depth), pushed in reverse so pieces pop in text order
        let mut work: Vec<(usize, usize, usize)> = vec![(0, text.len(), 0)];
        while let Some((start, end, depth)) = work.pop() {
            let segment = &text[start..end];
            let chars = char_len(segment);
            if chars <= limit || depth >= separators.len() {
                pieces.push(Span { start, end, chars });
                continue;
            }
            let separator = separators[depth].as_str();
            let mut parts = Vec::new();
            if separator.is_empty() {
                parts.extend(segment.char_indices().map(|(i, c)| (start + i, start + i + c.len_utf8())));
            } else {
                let mut offset = start;
                for part in segment.split_inclusive(separator) {
                    parts.push((offset, offset + part.len()));
                    offset += part.len();
                }
            }
            work.extend(parts.into_iter().rev().map(|(s, e)| (s, e, depth + 1)));
        }
        pieces
    }

    fn merge(&self, text: &str, pieces: &[Span]) -> Vec<Draft> {
        let chunk_size = self.config.chunk_size;
        let mut merger = Merger { text, chunk_size, chunk_overlap: self.config.chunk_overlap, drafts: Vec::new() };
        // the open group and the overlap it will receive once closed
        let mut group: Option<(Span, usize)> = None;
        for piece in pieces {
            if piece.chars > chunk_size {
                warn!(size = piece.chars, chunk_size, "unsplittable unit exceeds chunk size, emitting it oversized");
                if let Some((open, _)) = group.take() { merger.close(open); }
                merger.close(*piece);
                continue;
            }
            group = match group {
                Some((open, lead)) if lead + open.chars + piece.chars <= chunk_size => Some((open.extend(piece), lead)),
                Some((open, _)) => {
                    merger.close(open);
                    Some((*piece, merger.lead()))
                }
                None => Some((*piece, merger.lead())),
            };
        }
        if let Some((open, _)) = group { merger.close(open); }
        merger.drafts
    }
}

/// A byte range of the input and its length in characters.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    chars: usize,
}

impl Span {
    fn extend(self, next: &Span) -> Span {
        Span { start: self.start, end: next.end, chars: self.chars + next.chars }
    }
}

#[derive(Debug)]
struct Draft {
    text: String,
    overlap: usize,
    chars: usize,
}

struct Merger<'a> {
    text: &'a str,
    chunk_size: usize,
    chunk_overlap: usize,
    drafts: Vec<Draft>,
}

impl<'a> Merger<'a> {
    /// Characters the next chunk will copy from the previous one.
    fn lead(&self) -> usize {
        self.drafts.last().map_or(0, |prev| self.chunk_overlap.min(prev.chars))
    }

    /// Emit `span` trimmed, prefixed with the tail of the previous chunk.
    /// Whitespace between two chunks belongs to neither.
    fn close(&mut self, span: Span) {
        let core = self.text[span.start..span.end].trim();
        if core.is_empty() {
            return;
        }
        let core_chars = char_len(core);
        let mut overlap = self.lead();
        if overlap + core_chars > self.chunk_size {
            overlap = self.chunk_size.saturating_sub(core_chars);
        }
        let chunk_text = match self.drafts.last() {
            Some(prev) if overlap > 0 => format!("{}{}", tail(&prev.text, overlap), core),
            _ => core.to_string(),
        };
        self.drafts.push(Draft { text: chunk_text, overlap, chars: overlap + core_chars });
    }
}

fn char_len(s: &str) -> usize { s.chars().count() }

/// The last `chars` characters of `text`.
fn tail(text: &str, chars: usize) -> &str {
    if chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(chars - 1) {
        Some((offset, _)) => &text[offset..],
        None => text,
    }
}
