//! Document ingestion: extraction, chunking, and the index build pipeline

pub mod chunker;
pub mod extractor;
pub mod pipeline;

pub use chunker::{ChunkSpan, TextChunker};
pub use extractor::{ExtractedText, Extractor};
pub use pipeline::{IndexSummary, IngestionPipeline};
