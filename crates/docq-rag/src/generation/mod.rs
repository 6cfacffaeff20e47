//! Answer generation against an OpenAI compatible chat API

pub mod openai;
pub mod prompt;

pub use openai::OpenAiGenerator;
pub use prompt::PromptBuilder;

use async_trait::async_trait;

use crate::error::Result;

/// Produces the final answer from the question, the retrieved context, and
/// prior conversation turns.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        context: &str,
        history: &[(String, String)],
    ) -> Result<String>;

    /// Model label for logs.
    fn name(&self) -> &str;
}
