use std::fs;
use std::sync::Mutex;

use docqa_core::config::RagConfig;
use docqa_core::loader::TextLoader;
use docqa_core::traits::{ChunkStore, Generator};
use docqa_core::{Chunk, Chunker, ChunkerConfig, MetaValue};
use docqa_rag::{IngestReport, Ingestor, Outcome, RagOrchestrator};
use docqa_text::ChunkIndex;

#[derive(Default)]
struct EchoGenerator {
    last_user_message: Mutex<String>,
}

impl Generator for EchoGenerator {
    fn complete(&self, _system_prompt: &str, user_message: &str) -> anyhow::Result<String> {
        *self.last_user_message.lock().unwrap() = user_message.to_string();
        Ok("See [Document 1].".to_string())
    }
}

struct RejectingStore;

impl ChunkStore for RejectingStore {
    fn add(&self, _chunks: &[Chunk]) -> anyhow::Result<usize> {
        anyhow::bail!("disk full")
    }
}

#[test]
fn ingest_then_ask() {
    let tmp = tempfile::tempdir().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("fire.txt"), "Firecraft. Use dry tinder and small kindling to start a fire.").unwrap();
    fs::write(docs.join("water.md"), "Boil water for at least one minute before drinking.").unwrap();
    fs::write(docs.join("blank.txt"), "   \n").unwrap();
    fs::write(docs.join("image.png"), [0u8, 1, 2]).unwrap();

    let index = ChunkIndex::open(&tmp.path().join("index")).unwrap();
    let loader = TextLoader::new();
    let mut paths = loader.list_files(&docs);
    paths.push(docs.join("image.png"));

    let ingestor = Ingestor::new(loader, Chunker::new(ChunkerConfig::new(100, 10)).unwrap(), &index);
    let mut seen = 0;
    let report = ingestor.ingest_paths_with(&paths, |_| seen += 1).unwrap();
    assert_eq!(seen, paths.len());
    assert_eq!(report, IngestReport { documents: 2, chunks: 2, skipped: 2 });
    assert_eq!(index.stats().unwrap().total_chunks, 2);

    let generator = EchoGenerator::default();
    let rag = RagOrchestrator::new(&RagConfig::default(), &index, &generator).unwrap();
    let response = rag.query("how do I start a fire with tinder?");
    assert_eq!(response.outcome(), Outcome::Answered);
    assert_eq!(response.sources[0].position, 1);
    assert_eq!(response.sources[0].result.metadata.get("filename"), Some(&MetaValue::from("fire.txt")));
    assert!(response.sources[0].result.relevance > 0.0 && response.sources[0].result.relevance < 1.0);
    assert!(generator.last_user_message.lock().unwrap().contains("[Document 1]\nFirecraft."));

    index.clear().unwrap();
    assert_eq!(rag.query("tinder").outcome(), Outcome::NoResults);
}

#[test]
fn nothing_extractable_stores_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let index = ChunkIndex::in_memory().unwrap();
    let ingestor = Ingestor::new(TextLoader::new(), Chunker::new(ChunkerConfig::default()).unwrap(), &index);
    let report = ingestor.ingest_paths(&[tmp.path().join("missing.txt")]).unwrap();
    assert_eq!(report, IngestReport { documents: 0, chunks: 0, skipped: 1 });
}

#[test]
fn storage_failure_is_a_storage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("a.txt");
    fs::write(&path, "some text").unwrap();
    let ingestor = Ingestor::new(TextLoader::new(), Chunker::new(ChunkerConfig::default()).unwrap(), RejectingStore);
    let err = ingestor.ingest_paths(&[path]).unwrap_err();
    assert!(matches!(err, docqa_core::Error::Storage(ref msg) if msg.contains("disk full")));
}
