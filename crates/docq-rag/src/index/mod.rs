//! The in memory vector index and its on disk form

pub mod persist;
pub mod shared;
pub mod vector_index;

pub use persist::{CHUNKS_FILE, VECTORS_FILE};
pub use shared::SharedIndex;
pub use vector_index::{cosine_similarity, IndexEntry, SearchResult, VectorIndex};
