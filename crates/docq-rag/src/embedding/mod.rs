//! Embedding providers

pub mod openai;

pub use openai::OpenAiEmbedder;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Turns text into fixed width vectors. Query and document embeddings must
/// come from the same provider for the similarity scores to mean anything.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. The default routes through `embed_batch`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("embedding service returned no vector"))
    }

    /// Embed many texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Vector width this provider produces.
    fn dimensions(&self) -> usize;

    /// Whether a credential is available. Checked up front so a
    /// misconfigured server fails before any extraction work.
    fn is_configured(&self) -> bool;

    /// Provider label for logs.
    fn name(&self) -> &str;
}
