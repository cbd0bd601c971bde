use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER: &str = "text_with_stopwords";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _id_field = schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	let _text_field = schema_builder.add_text_field("text", text_options);
	// one `key=value` term per metadata entry, for exact-match filters
	let _meta_field = schema_builder.add_text_field("meta", STRING);
	let _metadata_field = schema_builder.add_text_field("metadata", STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER, tokenizer);
}

/// Map an unbounded BM25 score onto `[0, 1)`, preserving order.
pub fn relevance_from_score(score: f32) -> f32 {
	if score <= 0.0 { 0.0 } else { score / (1.0 + score) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn relevance_is_bounded_and_monotonic() {
		assert_eq!(relevance_from_score(0.0), 0.0);
		assert_eq!(relevance_from_score(-1.0), 0.0);
		let low = relevance_from_score(0.5);
		let high = relevance_from_score(12.0);
		assert!(low < high);
		assert!(high < 1.0);
	}

	#[test]
	fn schema_has_expected_fields() {
		let schema = build_schema();
		for name in ["id", "text", "meta", "metadata"] {
			assert!(schema.get_field(name).is_ok(), "missing field {name}");
		}
	}
}
