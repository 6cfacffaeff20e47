//! Shared application state

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, OpenAiEmbedder};
use crate::error::Result;
use crate::generation::{AnswerGenerator, OpenAiGenerator};
use crate::index::SharedIndex;
use crate::ingestion::{IngestionPipeline, TextChunker};
use crate::retrieval::RetrievalService;

/// Everything the handlers need. Cloning shares the same inner state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<SharedIndex>,
    pipeline: IngestionPipeline,
    retrieval: RetrievalService,
    generator: Arc<dyn AnswerGenerator>,
    /// Serializes ingestions; uploads queue behind whoever got here first.
    ingest_lock: Mutex<()>,
}

impl AppState {
    /// Wire up the OpenAI backed providers and recover the persisted index.
    pub async fn new(config: RagConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OpenAiEmbedder::new(config.embedding.clone())?);
        let generator: Arc<dyn AnswerGenerator> = Arc::new(OpenAiGenerator::new(
            config.generation.clone(),
            config.embedding.api_key.clone(),
        )?);
        Self::with_providers(config, embedder, generator).await
    }

    /// Same wiring with caller supplied providers.
    pub async fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(config.storage.uploads_dir()).await?;
        tokio::fs::create_dir_all(config.storage.index_dir()).await?;

        let index = Arc::new(SharedIndex::load_or_empty(&config.storage.index_dir()).await);
        tracing::info!("Index ready: {} chunks", index.snapshot().len());

        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.overlap);
        let pipeline = IngestionPipeline::new(
            chunker,
            embedder.clone(),
            index.clone(),
            config.storage.index_dir(),
        );
        let retrieval =
            RetrievalService::new(embedder.clone(), index.clone(), config.retrieval.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                index,
                pipeline,
                retrieval,
                generator,
                ingest_lock: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn index(&self) -> &SharedIndex {
        &self.inner.index
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.inner.pipeline
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.inner.retrieval
    }

    pub fn generator(&self) -> &Arc<dyn AnswerGenerator> {
        &self.inner.generator
    }

    pub fn ingest_lock(&self) -> &Mutex<()> {
        &self.inner.ingest_lock
    }
}
