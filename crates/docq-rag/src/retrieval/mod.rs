//! Query side: embed the question, search a snapshot, assemble context

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::index::{SearchResult, SharedIndex};

/// Context assembled for one question.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Numbered context block for the generator prompt
    pub context: String,
    /// The chunks behind it, best first
    pub chunks: Vec<SearchResult>,
}

/// Finds the passages most similar to a question. Works against whichever
/// index build is current when the query arrives and holds that snapshot
/// throughout.
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<SharedIndex>,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<SharedIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Retrieve context for `question`. `top_k` overrides the configured
    /// result count. Fails with `NoContext` when the index is empty or
    /// nothing clears the threshold and character budget.
    pub async fn retrieve(&self, question: &str, top_k: Option<usize>) -> Result<RetrievedContext> {
        let query_vector = self.embedder.embed(question).await?;
        let snapshot = self.index.snapshot();
        let k = top_k.unwrap_or(self.config.top_k);

        let mut results = match snapshot.search(&query_vector, k) {
            Ok(results) => results,
            Err(Error::EmptyIndex) => return Err(Error::NoContext),
            Err(e) => return Err(e),
        };

        if self.config.similarity_threshold > 0.0 {
            results.retain(|r| r.similarity >= self.config.similarity_threshold);
        }

        // Whole chunks only, best first, stopping at the first chunk that
        // would overflow the budget.
        let mut kept = Vec::new();
        let mut used_chars = 0;
        for result in results {
            let chunk_chars = result.chunk.text.chars().count();
            if used_chars + chunk_chars > self.config.max_context_chars {
                break;
            }
            used_chars += chunk_chars;
            kept.push(result);
        }

        if kept.is_empty() {
            return Err(Error::NoContext);
        }

        tracing::debug!("Retrieved {} chunks, {} context chars", kept.len(), used_chars);

        Ok(RetrievedContext {
            context: PromptBuilder::build_context(&kept),
            chunks: kept,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexEntry, VectorIndex};
    use crate::types::document::Chunk;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }

        fn dimensions(&self) -> usize {
            self.vector.len()
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn entry(vector: Vec<f32>, source: &str, text: &str, sequence_index: u32) -> IndexEntry {
        IndexEntry {
            vector,
            chunk: Chunk::new(Uuid::new_v4(), source, sequence_index, text, 0, text.len()),
        }
    }

    fn service(
        query_vector: Vec<f32>,
        entries: Vec<IndexEntry>,
        config: RetrievalConfig,
    ) -> RetrievalService {
        let index = if entries.is_empty() {
            VectorIndex::empty()
        } else {
            VectorIndex::build(entries).unwrap()
        };
        RetrievalService::new(
            Arc::new(FixedEmbedder {
                vector: query_vector,
            }),
            Arc::new(SharedIndex::new(index)),
            config,
        )
    }

    #[tokio::test]
    async fn empty_index_yields_no_context() {
        let service = service(vec![1.0, 0.0], Vec::new(), RetrievalConfig::default());
        let err = service.retrieve("anything", None).await.unwrap_err();
        assert!(matches!(err, Error::NoContext));
    }

    #[tokio::test]
    async fn best_match_comes_first() {
        let service = service(
            vec![1.0, 0.0],
            vec![
                entry(vec![0.0, 1.0], "far.txt", "far away text", 0),
                entry(vec![1.0, 0.0], "close.txt", "spot on text", 1),
            ],
            RetrievalConfig::default(),
        );
        let retrieved = service.retrieve("q", None).await.unwrap();
        assert_eq!(retrieved.chunks[0].chunk.source, "close.txt");
        assert!(retrieved.context.contains("spot on text"));
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let config = RetrievalConfig {
            similarity_threshold: 0.9,
            ..RetrievalConfig::default()
        };
        let service = service(
            vec![1.0, 0.0],
            vec![
                entry(vec![1.0, 0.0], "strong.txt", "strong match", 0),
                entry(vec![1.0, 1.0], "weak.txt", "weak match", 1),
            ],
            config,
        );
        let retrieved = service.retrieve("q", None).await.unwrap();
        assert_eq!(retrieved.chunks.len(), 1);
        assert_eq!(retrieved.chunks[0].chunk.source, "strong.txt");
    }

    #[tokio::test]
    async fn threshold_can_filter_everything() {
        let config = RetrievalConfig {
            similarity_threshold: 0.9,
            ..RetrievalConfig::default()
        };
        let service = service(
            vec![1.0, 0.0],
            vec![entry(vec![0.0, 1.0], "far.txt", "unrelated", 0)],
            config,
        );
        let err = service.retrieve("q", None).await.unwrap_err();
        assert!(matches!(err, Error::NoContext));
    }

    #[tokio::test]
    async fn context_budget_keeps_a_prefix_of_results() {
        let config = RetrievalConfig {
            max_context_chars: 15,
            ..RetrievalConfig::default()
        };
        let service = service(
            vec![1.0, 0.0],
            vec![
                entry(vec![1.0, 0.0], "a.txt", "ten chars!", 0),
                entry(vec![1.0, 0.1], "b.txt", "ten more!!", 1),
            ],
            config,
        );
        let retrieved = service.retrieve("q", None).await.unwrap();
        assert_eq!(retrieved.chunks.len(), 1);
        assert_eq!(retrieved.chunks[0].chunk.source, "a.txt");
    }

    #[tokio::test]
    async fn top_k_override_limits_results() {
        let service = service(
            vec![1.0, 0.0],
            vec![
                entry(vec![1.0, 0.0], "a.txt", "first", 0),
                entry(vec![1.0, 0.1], "b.txt", "second", 1),
                entry(vec![1.0, 0.2], "c.txt", "third", 2),
            ],
            RetrievalConfig::default(),
        );
        let retrieved = service.retrieve("q", Some(1)).await.unwrap();
        assert_eq!(retrieved.chunks.len(), 1);
    }
}
