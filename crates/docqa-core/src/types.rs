//! Domain types used by the chunker, the chunk index and the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ChunkId = String;
pub type Metadata = BTreeMap<String, MetaValue>;

/// A scalar metadata value. Anything richer is flattened to text by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self { MetaValue::Int(v) => Some(*v), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { MetaValue::Text(v) => Some(v), _ => None }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(v) => write!(f, "{v}"),
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetaValue { fn from(v: &str) -> Self { MetaValue::Text(v.to_string()) } }
impl From<String> for MetaValue { fn from(v: String) -> Self { MetaValue::Text(v) } }
impl From<bool> for MetaValue { fn from(v: bool) -> Self { MetaValue::Bool(v) } }
impl From<i64> for MetaValue { fn from(v: i64) -> Self { MetaValue::Int(v) } }
impl From<f64> for MetaValue { fn from(v: f64) -> Self { MetaValue::Float(v) } }
impl From<usize> for MetaValue { fn from(v: usize) -> Self { MetaValue::Int(i64::try_from(v).unwrap_or(i64::MAX)) } }

/// Raw text handed to the chunker together with caller-owned provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self { Self { text: text.into(), metadata: Metadata::new() } }

    pub fn with_metadata(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A bounded slice of a document, ready to be indexed.
///
/// - `text`: never empty; starts with `overlap` characters copied from the previous chunk
/// - `index`/`total_chunks`: position within the parent document's chunk sequence
/// - `size`: character count of `text`
/// - `oversized`: set when a single unsplittable unit exceeded the configured chunk size
/// - `metadata`: caller metadata plus `chunk_index`, `total_chunks` and `chunk_size`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub total_chunks: usize,
    pub size: usize,
    pub overlap: usize,
    pub oversized: bool,
    pub metadata: Metadata,
}

impl Chunk {
    /// The chunk text without the prefix shared with its predecessor.
    pub fn core_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((offset, _)) => &self.text[offset..],
            None => "",
        }
    }
}

/// One retrieval hit. `relevance` is a similarity in `[0, 1]`, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Metadata,
    pub relevance: f32,
}
