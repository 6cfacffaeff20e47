//! Prompt assembly for grounded answers

use crate::index::SearchResult;

/// Builds the prompts sent to the chat model.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn system_prompt() -> &'static str {
        "You are a helpful assistant that answers questions about the user's documents. \
         Keep answers concise and only use information from the provided context."
    }

    /// Numbered context block, one section per retrieved chunk.
    pub fn build_context(results: &[SearchResult]) -> String {
        let mut context = String::new();
        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                result.chunk.source,
                result.chunk.text
            ));
        }
        context
    }

    /// Final user message pairing the context with the question.
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            "Based on the following context, answer the question. \
             Only use information from the context.\n\n\
             Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
        )
    }
}
