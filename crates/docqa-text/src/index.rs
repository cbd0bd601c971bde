use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{Index, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tracing::{debug, info, warn};

use docqa_core::traits::{ChunkStore, Retriever};
use docqa_core::types::{Chunk, MetaValue, Metadata, RetrievalResult};

use crate::tantivy_utils::{build_schema, register_tokenizer, relevance_from_score};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
	pub total_chunks: u64,
	pub location: String,
}

/// Chunk store and keyword retriever over a single tantivy index.
///
/// Writers are serialized through an internal lock; searches open a fresh
/// searcher and always observe the last commit.
pub struct ChunkIndex {
	index: Index,
	location: Option<PathBuf>,
	id_field: Field,
	text_field: Field,
	meta_field: Field,
	metadata_field: Field,
	write_lock: Mutex<()>,
}

impl ChunkIndex {
	/// Open the index in `index_dir`, creating it (and the directory) if needed.
	pub fn open(index_dir: &Path) -> Result<Self> {
		std::fs::create_dir_all(index_dir)?;
		let directory = MmapDirectory::open(index_dir)?;
		let index = Index::open_or_create(directory, build_schema())?;
		Self::from_index(index, Some(index_dir.to_path_buf()))
	}

	pub fn in_memory() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()), None)
	}

	fn from_index(index: Index, location: Option<PathBuf>) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let id_field = schema.get_field("id")?;
		let text_field = schema.get_field("text")?;
		let meta_field = schema.get_field("meta")?;
		let metadata_field = schema.get_field("metadata")?;
		Ok(Self { index, location, id_field, text_field, meta_field, metadata_field, write_lock: Mutex::new(()) })
	}

	fn searcher(&self) -> Result<Searcher> {
		let reader = self.index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(reader.searcher())
	}

	fn writer(&self) -> Result<IndexWriter> {
		Ok(self.index.writer(WRITER_MEMORY_BYTES)?)
	}

	/// Delete every stored chunk.
	pub fn clear(&self) -> Result<()> {
		let _guard = self.write_lock.lock().map_err(|_| anyhow!("index write lock poisoned"))?;
		let mut index_writer = self.writer()?;
		index_writer.delete_all_documents()?;
		index_writer.commit()?;
		info!(location = %self.location_label(), "cleared chunk index");
		Ok(())
	}

	pub fn stats(&self) -> Result<IndexStats> {
		Ok(IndexStats { total_chunks: self.searcher()?.num_docs(), location: self.location_label() })
	}

	fn location_label(&self) -> String {
		self.location.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "memory".to_string())
	}

	fn to_document(&self, id: String, chunk: &Chunk) -> Result<TantivyDocument> {
		let metadata = storable_metadata(&chunk.metadata);
		let mut doc = TantivyDocument::default();
		doc.add_text(self.id_field, id);
		doc.add_text(self.text_field, &chunk.text);
		// metadata values are coerced to their string form for term matching
		for (key, value) in &metadata {
			doc.add_text(self.meta_field, format!("{key}={value}"));
		}
		doc.add_text(self.metadata_field, serde_json::to_string(&metadata)?);
		Ok(doc)
	}

	fn build_query(&self, query: &str, filter: Option<&Metadata>) -> Box<dyn Query> {
		let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (text_query, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() {
			debug!(?errors, "query parsed leniently");
		}
		let filter_clauses: Vec<(Occur, Box<dyn Query>)> = filter
			.into_iter()
			.flatten()
			.map(|(key, value)| {
				let term = Term::from_field_text(self.meta_field, &format!("{key}={value}"));
				(Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>)
			})
			.collect();
		if filter_clauses.is_empty() {
			return text_query;
		}
		let mut clauses = vec![(Occur::Must, text_query)];
		clauses.extend(filter_clauses);
		Box::new(BooleanQuery::new(clauses))
	}
}

/// JSON has no NaN or infinity; such floats are stored as their text form.
fn storable_metadata(metadata: &Metadata) -> Metadata {
	metadata
		.iter()
		.map(|(key, value)| {
			let value = match value {
				MetaValue::Float(v) if !v.is_finite() => MetaValue::Text(v.to_string()),
				other => other.clone(),
			};
			(key.clone(), value)
		})
		.collect()
}

impl ChunkStore for ChunkIndex {
	fn add(&self, chunks: &[Chunk]) -> Result<usize> {
		if chunks.is_empty() {
			warn!("no chunks provided to add");
			return Ok(0);
		}
		let _guard = self.write_lock.lock().map_err(|_| anyhow!("index write lock poisoned"))?;
		let base = self.searcher()?.num_docs();
		let mut index_writer = self.writer()?;
		for (offset, chunk) in (0u64..).zip(chunks) {
			index_writer.add_document(self.to_document(format!("chunk_{}", base + offset), chunk)?)?;
		}
		index_writer.commit()?;
		info!(count = chunks.len(), location = %self.location_label(), "added chunks to index");
		Ok(chunks.len())
	}
}

impl Retriever for ChunkIndex {
	fn search(&self, query: &str, top_k: usize, filter: Option<&Metadata>) -> Result<Vec<RetrievalResult>> {
		if top_k == 0 || query.trim().is_empty() {
			return Ok(Vec::new());
		}
		let searcher = self.searcher()?;
		let q = self.build_query(query, filter);
		let top_docs = searcher.search(&q, &TopDocs::with_limit(top_k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.id_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let text = doc.get_first(self.text_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let metadata = match doc.get_first(self.metadata_field).and_then(|v| v.as_str()) {
				Some(json) => serde_json::from_str::<Metadata>(json).unwrap_or_else(|e| {
					warn!(id = %id, error = %e, "unreadable stored metadata, returning hit without it");
					Metadata::new()
				}),
				None => Metadata::new(),
			};
			hits.push(RetrievalResult { id, text, metadata, relevance: relevance_from_score(score) });
		}
		info!(results = hits.len(), "retrieved results for query");
		Ok(hits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn non_finite_floats_become_text() {
		let mut metadata = Metadata::new();
		metadata.insert("nan".to_string(), MetaValue::Float(f64::NAN));
		metadata.insert("inf".to_string(), MetaValue::Float(f64::INFINITY));
		metadata.insert("ok".to_string(), MetaValue::Float(0.5));
		let stored = storable_metadata(&metadata);
		assert_eq!(stored.get("nan"), Some(&MetaValue::from("NaN")));
		assert_eq!(stored.get("inf"), Some(&MetaValue::from("inf")));
		assert_eq!(stored.get("ok"), Some(&MetaValue::Float(0.5)));
		let json = serde_json::to_string(&stored).expect("json");
		assert_eq!(serde_json::from_str::<Metadata>(&json).expect("parse"), stored);
	}
}
