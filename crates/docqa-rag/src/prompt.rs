//! Grounding prompt and context assembly.

use crate::orchestrator::Source;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that answers questions based on the provided context documents.

Rules:
1. Answer ONLY based on the information in the provided documents
2. If the answer is not in the documents, say \"I don't have enough information to answer that question\"
3. Cite which document number(s) you used when answering
4. Be concise but complete
5. If multiple documents have relevant information, synthesize them";

/// One `[Document N]` section per source, in retrieval order.
pub fn format_context(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| format!("[Document {}]\n{}", s.position, s.result.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn user_message(context: &str, question: &str) -> String {
    format!(
        "Context Documents:\n{context}\n\nQuestion: {question}\n\nPlease provide a clear, accurate answer based on the context above."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::{Metadata, RetrievalResult};

    fn source(position: usize, text: &str) -> Source {
        Source {
            position,
            result: RetrievalResult { id: format!("chunk_{position}"), text: text.to_string(), metadata: Metadata::new(), relevance: 0.5 },
        }
    }

    #[test]
    fn sections_are_tagged_and_separated() {
        let context = format_context(&[source(1, "alpha"), source(2, "beta")]);
        assert_eq!(context, "[Document 1]\nalpha\n\n[Document 2]\nbeta");
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn user_message_puts_context_before_question() {
        let msg = user_message("[Document 1]\nalpha", "what is alpha?");
        let ctx_at = msg.find("[Document 1]").expect("context");
        let q_at = msg.find("Question: what is alpha?").expect("question");
        assert!(msg.starts_with("Context Documents:\n"));
        assert!(ctx_at < q_at);
    }

    #[test]
    fn default_prompt_lists_grounding_rules() {
        for rule in ["ONLY", "enough information", "document number", "concise", "synthesize"] {
            assert!(DEFAULT_SYSTEM_PROMPT.contains(rule), "missing rule: {rule}");
        }
    }
}
