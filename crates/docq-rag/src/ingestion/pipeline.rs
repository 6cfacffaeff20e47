//! End to end ingestion: extract, chunk, embed, index, persist, swap

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::index::{IndexEntry, SharedIndex, VectorIndex};
use crate::types::document::{Chunk, Document};

use super::chunker::TextChunker;
use super::extractor::Extractor;

/// What an ingestion produced.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IndexSummary {
    pub document_count: usize,
    pub chunk_count: usize,
}

/// Runs one upload batch end to end and replaces the index wholesale.
/// The batch succeeds or fails as a unit; on failure the previous build
/// stays live in memory and untouched on disk.
pub struct IngestionPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<SharedIndex>,
    index_dir: PathBuf,
}

impl IngestionPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<SharedIndex>,
        index_dir: PathBuf,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            index_dir,
        }
    }

    /// Build a fresh index from `documents` and swap it in.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IndexSummary> {
        if documents.is_empty() {
            return Err(Error::empty_document("no documents in the ingestion request"));
        }
        if !self.embedder.is_configured() {
            return Err(Error::configuration(
                "no embedding credential configured, set OPENAI_API_KEY",
            ));
        }

        let started = Instant::now();

        // Extract and chunk everything before the first network call.
        let mut chunks: Vec<Chunk> = Vec::new();
        for document in documents {
            let extracted = Extractor::extract(document)?;
            tracing::debug!(
                "Extracted {} chars from '{}' (hash {})",
                extracted.text.chars().count(),
                document.filename,
                &extracted.content_hash[..12]
            );

            let spans = self.chunker.chunk(&extracted.text);
            if spans.is_empty() {
                return Err(Error::empty_document(document.filename.clone()));
            }
            let before = chunks.len();
            for (i, span) in spans.iter().enumerate() {
                chunks.push(Chunk::new(
                    document.id,
                    document.filename.clone(),
                    i as u32,
                    &extracted.text[span.byte_start..span.byte_end],
                    span.char_start,
                    span.char_end,
                ));
            }
            tracing::info!(
                "Chunked '{}' into {} chunks",
                document.filename,
                chunks.len() - before
            );
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "embedding service returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexEntry> = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| IndexEntry { vector, chunk })
            .collect();
        let new_index = VectorIndex::build(entries)?;
        let chunk_count = new_index.len();

        // Persist first; the in memory handle only ever points at a build
        // that is already safe on disk.
        new_index.save(&self.index_dir).await?;
        self.index.replace(new_index);

        tracing::info!(
            "Ingested {} documents into {} chunks in {:.1}s",
            documents.len(),
            chunk_count,
            started.elapsed().as_secs_f64()
        );
        Ok(IndexSummary {
            document_count: documents.len(),
            chunk_count,
        })
    }
}
