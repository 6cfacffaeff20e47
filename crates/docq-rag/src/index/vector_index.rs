//! Immutable vector index with exhaustive cosine search

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::document::Chunk;

/// One embedded chunk, the input unit for index builds.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A chunk scored against a query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Snapshot of everything searchable. Built in one shot per ingestion and
/// never mutated afterwards; readers keep an `Arc` to whichever build was
/// current when their request arrived.
#[derive(Debug)]
pub struct VectorIndex {
    build_id: Uuid,
    built_at: DateTime<Utc>,
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// An index with no entries. Searching it reports `EmptyIndex`.
    pub fn empty() -> Self {
        Self {
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            dimensions: 0,
            vectors: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Build an index from embedded chunks. The first entry fixes the vector
    /// width; any entry that disagrees fails the whole build.
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Ok(Self::empty());
        };
        let dimensions = first.vector.len();
        if dimensions == 0 {
            return Err(Error::embedding("cannot index zero width vectors"));
        }

        let mut vectors = Vec::with_capacity(entries.len());
        let mut chunks = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.vector.len() != dimensions {
                return Err(Error::embedding(format!(
                    "vector width mismatch within one build: {} vs {}",
                    entry.vector.len(),
                    dimensions
                )));
            }
            vectors.push(entry.vector);
            chunks.push(entry.chunk);
        }

        Ok(Self {
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            dimensions,
            vectors,
            chunks,
        })
    }

    pub(crate) fn from_parts(
        build_id: Uuid,
        built_at: DateTime<Utc>,
        dimensions: usize,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<Chunk>,
    ) -> Self {
        Self {
            build_id,
            built_at,
            dimensions,
            vectors,
            chunks,
        }
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Score every entry against the query and return the best `k`, ordered
    /// by similarity descending with ties broken by insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.chunks.is_empty() {
            return Err(Error::EmptyIndex);
        }
        if query.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "query vector has {} dimensions, index was built with {}",
                query.len(),
                self.dimensions
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, cosine_similarity(query, vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, similarity)| SearchResult {
                chunk: self.chunks[idx].clone(),
                similarity,
            })
            .collect())
    }
}

/// Cosine similarity over equal length vectors. Zero magnitude on either
/// side scores 0.0 rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
