//! Document question answering over a local vector index.
//!
//! Upload documents and ask questions about them. The service extracts and
//! chunks document text, embeds the chunks through an OpenAI compatible
//! API, and keeps them in an in memory vector index persisted as JSON on
//! disk. Questions are embedded the same way, matched by cosine similarity,
//! and answered by a chat model grounded in the retrieved passages.
//!
//! Each upload rebuilds the index from exactly that batch of files; the
//! previous build stays live until its replacement is complete and on disk.

pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use index::{SearchResult, SharedIndex, VectorIndex};
pub use ingestion::{IngestionPipeline, TextChunker};
pub use retrieval::{RetrievalService, RetrievedContext};
pub use types::{ChatRequest, ChatResponse, Chunk, Document, DocumentFormat, IngestResponse};
