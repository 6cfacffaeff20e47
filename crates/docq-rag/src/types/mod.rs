//! Core data types shared across the pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, DocumentFormat};
pub use query::ChatRequest;
pub use response::{ChatResponse, HealthResponse, IngestResponse, SourceRef};
