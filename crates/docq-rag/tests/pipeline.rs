//! End to end pipeline tests with deterministic in process providers.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use docq_rag::config::{RagConfig, RetrievalConfig};
use docq_rag::embedding::EmbeddingProvider;
use docq_rag::generation::AnswerGenerator;
use docq_rag::retrieval::RetrievalService;
use docq_rag::server::AppState;
use docq_rag::{
    Document, DocumentFormat, Error, IngestionPipeline, Result, SharedIndex, TextChunker,
    VectorIndex,
};

const DIMS: usize = 128;

/// Bag of words embedder bucketing each token by its first two characters.
/// Deterministic, so the similarity rankings asserted below are stable.
struct PairEmbedder;

fn bucket(token: &str) -> usize {
    let mut chars = token.chars();
    let a = chars.next().map(|c| c as u32).unwrap_or(0);
    let b = chars.next().map(|c| c as u32).unwrap_or(0);
    ((a * 31 + b) % DIMS as u32) as usize
}

fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; DIMS];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        vector[bucket(token)] += 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for PairEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "pair-embedder"
    }
}

/// Always errors, standing in for an unreachable embedding service.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::embedding("embedding service is down"))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "failing-embedder"
    }
}

/// Reports no credential and records whether anyone called it anyway.
struct UnconfiguredEmbedder {
    called: Arc<AtomicBool>,
}

#[async_trait]
impl EmbeddingProvider for UnconfiguredEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.called.store(true, Ordering::SeqCst);
        Err(Error::configuration("no credential"))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unconfigured-embedder"
    }
}

/// Echoes how much context it was grounded in.
struct CannedGenerator;

#[async_trait]
impl AnswerGenerator for CannedGenerator {
    async fn generate(
        &self,
        _question: &str,
        context: &str,
        _history: &[(String, String)],
    ) -> Result<String> {
        Ok(format!(
            "answer grounded in {} context chars",
            context.chars().count()
        ))
    }

    fn name(&self) -> &str {
        "canned-generator"
    }
}

fn text_document(filename: &str, content: &str) -> Document {
    Document::new(filename, DocumentFormat::Txt, content.as_bytes().to_vec())
}

fn small_pipeline(
    dir: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    shared: Arc<SharedIndex>,
) -> IngestionPipeline {
    IngestionPipeline::new(TextChunker::new(20, 5), embedder, shared, dir.to_path_buf())
}

#[tokio::test]
async fn two_sentence_document_splits_and_the_right_chunk_wins() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(PairEmbedder);
    let pipeline = small_pipeline(dir.path(), embedder.clone(), shared.clone());

    let summary = pipeline
        .ingest(&[text_document(
            "sky.txt",
            "The sky is blue. The grass is green.",
        )])
        .await
        .unwrap();
    assert_eq!(summary.document_count, 1);
    assert!(
        summary.chunk_count >= 2,
        "two sentences should not fit one window"
    );

    let retrieval = RetrievalService::new(embedder, shared, RetrievalConfig::default());
    let retrieved = retrieval
        .retrieve("What color is the sky?", None)
        .await
        .unwrap();
    assert!(retrieved.chunks[0].chunk.text.contains("sky is blue"));
    assert_eq!(retrieved.chunks[0].chunk.source, "sky.txt");
    assert!(retrieved.context.contains("sky is blue"));
}

#[tokio::test]
async fn question_against_an_empty_index_reports_no_context() {
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let retrieval = RetrievalService::new(
        Arc::new(PairEmbedder),
        shared,
        RetrievalConfig::default(),
    );

    let err = retrieval
        .retrieve("anything at all?", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoContext));
}

#[tokio::test]
async fn each_upload_replaces_the_previous_index() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(PairEmbedder);
    let pipeline = small_pipeline(dir.path(), embedder.clone(), shared.clone());

    pipeline
        .ingest(&[text_document(
            "sky.txt",
            "The sky is blue. The grass is green.",
        )])
        .await
        .unwrap();
    pipeline
        .ingest(&[text_document(
            "cities.txt",
            "Paris is the capital of France.",
        )])
        .await
        .unwrap();

    let snapshot = shared.snapshot();
    assert!(snapshot.chunks().iter().all(|c| c.source == "cities.txt"));

    let on_disk = VectorIndex::load(dir.path()).await.unwrap().unwrap();
    assert_eq!(on_disk.build_id(), snapshot.build_id());
    assert!(on_disk.chunks().iter().all(|c| c.source == "cities.txt"));

    let retrieval = RetrievalService::new(embedder, shared, RetrievalConfig::default());
    let retrieved = retrieval
        .retrieve("What is the capital of France?", None)
        .await
        .unwrap();
    assert!(retrieved
        .chunks
        .iter()
        .all(|r| r.chunk.source == "cities.txt"));
}

#[tokio::test]
async fn failed_embedding_leaves_the_previous_index_live_and_on_disk() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let good = small_pipeline(dir.path(), Arc::new(PairEmbedder), shared.clone());

    good.ingest(&[text_document("keep.txt", "Original content worth keeping.")])
        .await
        .unwrap();
    let old_build = shared.snapshot().build_id();

    let bad = small_pipeline(dir.path(), Arc::new(FailingEmbedder), shared.clone());
    let err = bad
        .ingest(&[text_document("new.txt", "Content that never lands.")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));

    assert_eq!(shared.snapshot().build_id(), old_build);
    let on_disk = VectorIndex::load(dir.path()).await.unwrap().unwrap();
    assert_eq!(on_disk.build_id(), old_build);
    assert_eq!(on_disk.chunks()[0].source, "keep.txt");
}

#[tokio::test]
async fn a_bad_document_fails_the_whole_batch() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let pipeline = small_pipeline(dir.path(), Arc::new(PairEmbedder), shared.clone());

    pipeline
        .ingest(&[text_document("keep.txt", "Original content worth keeping.")])
        .await
        .unwrap();
    let old_build = shared.snapshot().build_id();

    let err = pipeline
        .ingest(&[
            text_document("fine.txt", "Perfectly good words here."),
            text_document("blank.txt", "   \n\t  "),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyDocument(_)));

    // nothing from the failed batch is visible anywhere
    assert_eq!(shared.snapshot().build_id(), old_build);
    assert!(shared
        .snapshot()
        .chunks()
        .iter()
        .all(|c| c.source == "keep.txt"));
}

#[tokio::test]
async fn missing_credential_is_rejected_before_any_work() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let called = Arc::new(AtomicBool::new(false));
    let pipeline = small_pipeline(
        dir.path(),
        Arc::new(UnconfiguredEmbedder {
            called: called.clone(),
        }),
        shared.clone(),
    );

    let err = pipeline
        .ingest(&[text_document("doc.txt", "Some content.")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(!called.load(Ordering::SeqCst), "no embedding call expected");
    assert!(shared.snapshot().is_empty());
}

#[tokio::test]
async fn empty_batches_are_rejected() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let pipeline = small_pipeline(dir.path(), Arc::new(PairEmbedder), shared);

    let err = pipeline.ingest(&[]).await.unwrap_err();
    assert!(matches!(err, Error::EmptyDocument(_)));
}

#[tokio::test]
async fn chunk_spans_reassemble_the_document() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let pipeline = IngestionPipeline::new(
        TextChunker::new(50, 10),
        Arc::new(PairEmbedder),
        shared.clone(),
        dir.path().to_path_buf(),
    );

    let text = "Rust is a systems programming language. It runs fast. \
                It prevents segfaults. It guarantees thread safety. \
                Many teams use it in production today.";
    pipeline
        .ingest(&[text_document("rust.txt", text)])
        .await
        .unwrap();

    let snapshot = shared.snapshot();
    let mut chunks = snapshot.chunks().to_vec();
    chunks.sort_by_key(|c| c.sequence_index);

    assert_eq!(chunks[0].char_start, 0);
    assert_eq!(chunks.last().unwrap().char_end, text.chars().count());
    for chunk in &chunks {
        assert_eq!(chunk.text.chars().count(), chunk.char_len());
    }
    for pair in chunks.windows(2) {
        assert!(pair[1].char_start <= pair[0].char_end, "no gaps");
        assert!(pair[0].char_end - pair[1].char_start <= 10, "overlap bound");
    }
}

#[tokio::test]
async fn queries_in_flight_keep_their_snapshot() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
    let pipeline = small_pipeline(dir.path(), Arc::new(PairEmbedder), shared.clone());

    pipeline
        .ingest(&[text_document("old.txt", "The old content.")])
        .await
        .unwrap();
    let held = shared.snapshot();

    pipeline
        .ingest(&[text_document("new.txt", "The new content.")])
        .await
        .unwrap();

    assert!(held.chunks().iter().all(|c| c.source == "old.txt"));
    assert!(shared
        .snapshot()
        .chunks()
        .iter()
        .all(|c| c.source == "new.txt"));
}

fn config_at(dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.storage.data_dir = dir.to_path_buf();
    config.chunking.chunk_size = 40;
    config.chunking.overlap = 10;
    config
}

#[tokio::test]
async fn state_wires_the_whole_flow_and_survives_restart() {
    let dir = TempDir::new().unwrap();

    let state = AppState::with_providers(
        config_at(dir.path()),
        Arc::new(PairEmbedder),
        Arc::new(CannedGenerator),
    )
    .await
    .unwrap();

    state
        .pipeline()
        .ingest(&[text_document(
            "sky.txt",
            "The sky is blue. The grass is green.",
        )])
        .await
        .unwrap();
    let indexed_chunks = state.index().snapshot().len();

    let retrieved = state
        .retrieval()
        .retrieve("What color is the sky?", None)
        .await
        .unwrap();
    let answer = state
        .generator()
        .generate("What color is the sky?", &retrieved.context, &[])
        .await
        .unwrap();
    assert!(answer.contains("context chars"));

    assert!(dir.path().join("uploads").is_dir());
    assert!(dir.path().join("index").join("vectors.json").exists());
    assert!(dir.path().join("index").join("chunks.json").exists());

    // a second state over the same data dir picks the index back up
    let restarted = AppState::with_providers(
        config_at(dir.path()),
        Arc::new(PairEmbedder),
        Arc::new(CannedGenerator),
    )
    .await
    .unwrap();
    assert_eq!(restarted.index().snapshot().len(), indexed_chunks);

    let retrieved = restarted
        .retrieval()
        .retrieve("What color is the sky?", None)
        .await
        .unwrap();
    assert!(retrieved.chunks[0].chunk.text.contains("sky is blue"));
}
