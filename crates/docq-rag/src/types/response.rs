//! Response shapes for the HTTP surface

use serde::{Deserialize, Serialize};

use crate::index::SearchResult;

/// Longest snippet echoed back per source.
const SNIPPET_CHARS: usize = 800;

/// Standing answer when retrieval finds nothing usable.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information in the documents to answer this question.";

/// One retrieved passage backing an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Filename the passage came from
    pub source: String,
    /// Leading slice of the chunk text
    pub snippet: String,
    pub similarity: f32,
}

impl SourceRef {
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            source: result.chunk.source.clone(),
            snippet: truncate_snippet(&result.chunk.text, SNIPPET_CHARS),
            similarity: result.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub processing_time_ms: u64,
}

impl ChatResponse {
    pub fn new(answer: impl Into<String>, sources: Vec<SourceRef>, processing_time_ms: u64) -> Self {
        Self {
            answer: answer.into(),
            sources,
            processing_time_ms,
        }
    }

    /// Response for a question the index has nothing relevant for.
    pub fn not_found(processing_time_ms: u64) -> Self {
        Self {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
            processing_time_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub document_count: usize,
    pub chunk_count: usize,
    pub files: Vec<String>,
    pub processing_time_ms: u64,
}

impl IngestResponse {
    pub fn ingested(
        document_count: usize,
        chunk_count: usize,
        files: Vec<String>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            status: "ingested".to_string(),
            document_count,
            chunk_count,
            files,
            processing_time_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub index_chunks: usize,
    pub embedding_model: String,
}

/// Cut `text` down to `max_chars` characters, appending an ellipsis when
/// anything was dropped. Cuts on character boundaries, never mid code point.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_end, _)) => format!("{}...", &text[..byte_end]),
    }
}
