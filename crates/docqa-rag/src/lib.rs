pub mod anthropic;
pub mod ingest;
pub mod orchestrator;
pub mod prompt;

pub use anthropic::AnthropicGenerator;
pub use ingest::{IngestReport, Ingestor};
pub use orchestrator::{Outcome, RagOrchestrator, RagResponse, Source, NO_DOCUMENTS_MESSAGE};
