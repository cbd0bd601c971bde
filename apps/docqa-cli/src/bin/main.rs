//! docqa: ingest plain-text documents and ask grounded questions about them.
//!
//! Usage:
//!   docqa ingest [DIR] [--limit N]   # chunk and index every .txt/.text/.md file
//!   docqa chunk <FILE> [--show]      # show how a single file would be chunked
//!   docqa search <QUERY> [--limit N] # keyword search over indexed chunks
//!   docqa ask <QUESTION>             # retrieve context and answer with Claude
//!   docqa stats | clear

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docqa_core::config::Config;
use docqa_core::loader::TextLoader;
use docqa_core::traits::{Retriever, TextExtractor};
use docqa_core::{Chunker, MetaValue};
use docqa_rag::{AnthropicGenerator, Ingestor, Outcome, RagOrchestrator};
use docqa_text::ChunkIndex;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Document question answering over a local chunk index")]
struct Cli {
    /// Index directory (overrides data.index_dir)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk and index every supported file under DIR (default: data.docs_dir)
    Ingest {
        dir: Option<PathBuf>,
        /// Only ingest the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print chunk statistics for one file
    Chunk {
        file: PathBuf,
        /// Also print every chunk
        #[arg(long)]
        show: bool,
    },
    /// Keyword search over indexed chunks
    Search {
        query: String,
        /// Number of results (default: rag.top_k)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Answer a question from the indexed documents
    Ask { question: String },
    /// Show index statistics
    Stats,
    /// Delete every indexed chunk
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let data = config.data()?;
    let index_dir = cli.index.clone().unwrap_or_else(|| data.index_dir(config.base_dir()));
    debug!(index_dir = %index_dir.display(), "resolved index directory");

    match cli.command {
        Command::Ingest { dir, limit } => {
            let dir = dir.unwrap_or_else(|| data.docs_dir(config.base_dir()));
            if !dir.is_dir() {
                bail!("documents directory not found: {}", dir.display());
            }
            let loader = TextLoader::new();
            let mut paths = loader.list_files(&dir);
            if let Some(limit) = limit {
                paths.truncate(limit);
            }
            if paths.is_empty() {
                println!("No supported files found in {}", dir.display());
                return Ok(());
            }
            println!("Ingesting {} files from {} into {}", paths.len(), dir.display(), index_dir.display());

            let index = ChunkIndex::open(&index_dir)?;
            let ingestor = Ingestor::new(loader, Chunker::new(config.chunking()?)?, &index);
            let pb = ProgressBar::new(paths.len() as u64);
            pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")?.progress_chars("#>-"));
            let report = ingestor.ingest_paths_with(&paths, |path| {
                pb.inc(1);
                pb.set_message(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
            })?;
            pb.finish_with_message("done");
            println!("📊 {} documents, {} chunks indexed, {} files skipped", report.documents, report.chunks, report.skipped);
        }
        Command::Chunk { file, show } => {
            let document = TextLoader::new().extract(&file)?;
            let chunker = Chunker::new(config.chunking()?)?;
            let chunks = chunker.segment(&document.text, &document.metadata);
            println!("{}", serde_json::to_string_pretty(&Chunker::stats(&chunks))?);
            if show {
                for chunk in &chunks {
                    let flag = if chunk.oversized { " oversized" } else { "" };
                    println!("\n--- chunk {}/{} ({} chars, {} overlap{}) ---", chunk.index + 1, chunk.total_chunks, chunk.size, chunk.overlap, flag);
                    println!("{}", chunk.text);
                }
            }
        }
        Command::Search { query, limit } => {
            let index = ChunkIndex::open(&index_dir)?;
            let top_k = match limit { Some(n) => n, None => config.rag()?.top_k };
            let results = index.search(&query, top_k, None)?;
            if results.is_empty() {
                println!("No results for '{}'", query);
            }
            for (i, hit) in results.iter().enumerate() {
                println!("{}. [{:.3}] {} ({})", i + 1, hit.relevance, source_label(&hit.metadata), hit.id);
                println!("   {}", snippet(&hit.text, 200));
            }
        }
        Command::Ask { question } => {
            let index = ChunkIndex::open(&index_dir)?;
            let generator = AnthropicGenerator::new(&config.generation()?)?;
            let rag = RagOrchestrator::new(&config.rag()?, &index, generator)?;
            let response = rag.query(&question);
            println!("{}", response.answer);
            if !response.sources.is_empty() {
                println!("\nSources:");
                for source in &response.sources {
                    println!("  [Document {}] {} (relevance {:.3})", source.position, source_label(&source.result.metadata), source.result.relevance);
                }
            }
            if response.outcome() == Outcome::Degraded {
                std::process::exit(1);
            }
        }
        Command::Stats => {
            let stats = ChunkIndex::open(&index_dir)?.stats()?;
            println!("Index: {}", stats.location);
            println!("Chunks: {}", stats.total_chunks);
        }
        Command::Clear => {
            ChunkIndex::open(&index_dir)?.clear()?;
            println!("✅ Cleared index at {}", index_dir.display());
        }
    }
    Ok(())
}

fn source_label(metadata: &docqa_core::Metadata) -> String {
    let name = metadata.get("filename").and_then(MetaValue::as_str).unwrap_or("unknown");
    match metadata.get("chunk_index").and_then(MetaValue::as_i64) {
        Some(i) => format!("{name} #{i}"),
        None => name.to_string(),
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}
