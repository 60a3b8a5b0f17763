//! Prompt templates for grounded answer generation

use crate::types::{HistoryMessage, MessageRole, ScoredChunk};

/// Prompt builder for document-grounded queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build numbered context sections from ranked chunks
    pub fn build_context(chunks: &[ScoredChunk]) -> String {
        let mut context = String::new();

        for (i, scored) in chunks.iter().enumerate() {
            context.push_str(&format!(
                "[{}] Page {}\n\n{}\n\n---\n\n",
                i + 1,
                scored.chunk.page_number,
                scored.chunk.text
            ));
        }

        context
    }

    /// Format the conversation tail for the prompt
    fn format_history(history: &[HistoryMessage]) -> String {
        if history.is_empty() {
            return String::new();
        }

        let lines: Vec<String> = history
            .iter()
            .map(|m| match m.role {
                MessageRole::Query => format!("Q: {}", m.text),
                MessageRole::Answer => format!("A: {}", m.text),
            })
            .collect();

        format!("\nCONVERSATION SO FAR:\n{}\n", lines.join("\n"))
    }

    /// Build the full grounded prompt
    pub fn build_grounded_prompt(
        question: &str,
        chunks: &[ScoredChunk],
        history: &[HistoryMessage],
    ) -> String {
        format!(
            r#"You are a document-grounded assistant that ONLY uses information from provided documents.

RULES:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. NEVER use external knowledge or make inferences beyond what is stated
4. Cite the page for every claim in this format: [Page X]
{history}
CONTEXT FROM DOCUMENTS:
{context}

QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            history = Self::format_history(history),
            context = Self::build_context(chunks),
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContextChunk;
    use uuid::Uuid;

    fn scored(text: &str, page: u32) -> ScoredChunk {
        ScoredChunk {
            chunk: ContextChunk::new(Uuid::new_v4(), page, text.to_string(), 0, text.len()),
            score: 0.9,
        }
    }

    #[test]
    fn context_numbers_chunks_with_pages() {
        let context =
            PromptBuilder::build_context(&[scored("alpha", 1), scored("beta", 7)]);
        assert!(context.contains("[1] Page 1"));
        assert!(context.contains("[2] Page 7"));
        assert!(context.contains("beta"));
    }

    #[test]
    fn prompt_includes_history_tail() {
        let history = vec![
            HistoryMessage {
                role: MessageRole::Query,
                text: "first question".to_string(),
                sources: Vec::new(),
                timestamp: chrono::Utc::now(),
            },
            HistoryMessage {
                role: MessageRole::Answer,
                text: "first answer".to_string(),
                sources: Vec::new(),
                timestamp: chrono::Utc::now(),
            },
        ];
        let prompt =
            PromptBuilder::build_grounded_prompt("next?", &[scored("ctx", 2)], &history);
        assert!(prompt.contains("Q: first question"));
        assert!(prompt.contains("A: first answer"));
        assert!(prompt.contains("QUESTION: next?"));
    }
}
