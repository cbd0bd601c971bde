//! Retrieval-then-generation answer flow.
//!
//! `retrieve_context` and `generate_answer` propagate collaborator failures as
//! typed errors. `query` never fails: an empty retrieval yields the fixed
//! no-documents answer and any collaborator error becomes a degraded response.

use serde::Serialize;
use tracing::{debug, error, info};

use docqa_core::config::RagConfig;
use docqa_core::traits::{Generator, Retriever};
use docqa_core::{Error, Result, RetrievalResult};

use crate::prompt::{format_context, user_message, DEFAULT_SYSTEM_PROMPT};

pub const NO_DOCUMENTS_MESSAGE: &str = "I don't have any documents to answer your question. Please upload documents first.";

/// A retrieval hit as cited in the context: `position` is its 1-based
/// `[Document N]` marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub position: usize,
    #[serde(flatten)]
    pub result: RetrievalResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoResults,
    Answered,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    /// Exactly the context sent to the generator; empty when nothing was retrieved.
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RagResponse {
    fn no_results() -> Self {
        Self { answer: NO_DOCUMENTS_MESSAGE.to_string(), sources: Vec::new(), context: String::new(), error: None }
    }

    fn degraded(err: &Error) -> Self {
        Self {
            answer: format!("Error processing your question: {err}"),
            sources: Vec::new(),
            context: String::new(),
            error: Some(err.to_string()),
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.error.is_some() {
            Outcome::Degraded
        } else if self.sources.is_empty() {
            Outcome::NoResults
        } else {
            Outcome::Answered
        }
    }
}

pub struct RagOrchestrator<R, G> {
    retriever: R,
    generator: G,
    top_k: usize,
    system_prompt: String,
}

impl<R: Retriever, G: Generator> RagOrchestrator<R, G> {
    pub fn new(config: &RagConfig, retriever: R, generator: G) -> Result<Self> {
        config.validate()?;
        let system_prompt = config
            .system_prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        info!(top_k = config.top_k, "initialized RAG orchestrator");
        Ok(Self { retriever, generator, top_k: config.top_k, system_prompt })
    }

    /// Fetch the best `top_k` matches and format them as tagged context.
    /// No matches gives `(vec![], "")`.
    pub fn retrieve_context(&self, query: &str) -> Result<(Vec<Source>, String)> {
        let mut results = self
            .retriever
            .search(query, self.top_k, None)
            .map_err(|e| Error::Retrieval(format!("{e:#}")))?;
        if results.is_empty() {
            debug!("retrieval returned no results");
            return Ok((Vec::new(), String::new()));
        }
        results.truncate(self.top_k);
        let sources: Vec<Source> = results
            .into_iter()
            .enumerate()
            .map(|(i, result)| Source { position: i + 1, result })
            .collect();
        let context = format_context(&sources);
        debug!(sources = sources.len(), context_chars = context.chars().count(), "assembled context");
        Ok((sources, context))
    }

    /// Ask the generator to answer `query` from `context`. A blank override
    /// falls back to the configured system prompt.
    pub fn generate_answer(&self, query: &str, context: &str, system_prompt: Option<&str>) -> Result<String> {
        let system_prompt = system_prompt.filter(|p| !p.trim().is_empty()).unwrap_or(self.system_prompt.as_str());
        let answer = self
            .generator
            .complete(system_prompt, &user_message(context, query))
            .map_err(|e| {
                let cause = format!("{e:#}");
                error!(error = %cause, "error generating answer");
                Error::Generation(cause)
            })?;
        info!(query = %preview(query), "generated answer");
        Ok(answer)
    }

    pub fn query(&self, question: &str) -> RagResponse {
        match self.answer(question) {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "error in RAG query");
                RagResponse::degraded(&e)
            }
        }
    }

    fn answer(&self, question: &str) -> Result<RagResponse> {
        let (sources, context) = self.retrieve_context(question)?;
        if sources.is_empty() {
            return Ok(RagResponse::no_results());
        }
        let answer = self.generate_answer(question, &context, None)?;
        Ok(RagResponse { answer, sources, context, error: None })
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(50).collect();
    if text.chars().nth(50).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_queries() {
        assert_eq!(preview("short"), "short");
        let long = "q".repeat(80);
        assert_eq!(preview(&long), format!("{}...", "q".repeat(50)));
    }

    #[test]
    fn outcome_follows_response_shape() {
        assert_eq!(RagResponse::no_results().outcome(), Outcome::NoResults);
        assert_eq!(RagResponse::degraded(&Error::Generation("boom".to_string())).outcome(), Outcome::Degraded);
        let answered = RagResponse {
            answer: "yes".to_string(),
            sources: vec![Source {
                position: 1,
                result: RetrievalResult { id: "chunk_0".to_string(), text: "t".to_string(), metadata: Default::default(), relevance: 0.4 },
            }],
            context: "[Document 1]\nt".to_string(),
            error: None,
        };
        assert_eq!(answered.outcome(), Outcome::Answered);
    }

    #[test]
    fn source_serializes_flat() {
        let source = Source {
            position: 2,
            result: RetrievalResult { id: "chunk_7".to_string(), text: "t".to_string(), metadata: Default::default(), relevance: 0.5 },
        };
        let json = serde_json::to_value(&source).expect("json");
        assert_eq!(json["position"], 2);
        assert_eq!(json["id"], "chunk_7");
    }
}
