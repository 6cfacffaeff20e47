//! Shared handle to the current index build

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::vector_index::VectorIndex;

/// The one mutable cell in the system: which index build is current.
/// Readers take an `Arc` snapshot and keep it for the whole query, so an
/// ingestion finishing mid query never changes what that query sees.
pub struct SharedIndex {
    current: RwLock<Arc<VectorIndex>>,
}

impl SharedIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// Start from whatever survives on disk. Unreadable artifacts are
    /// logged and set aside so the server still comes up; the next upload
    /// overwrites them.
    pub async fn load_or_empty(dir: &Path) -> Self {
        match VectorIndex::load(dir).await {
            Ok(Some(index)) => {
                tracing::info!(
                    "Loaded persisted index: {} chunks, {} dimensions",
                    index.len(),
                    index.dimensions()
                );
                Self::new(index)
            }
            Ok(None) => {
                tracing::info!("No persisted index found, starting empty");
                Self::new(VectorIndex::empty())
            }
            Err(e) => {
                tracing::warn!("Setting aside unreadable index, starting empty: {}", e);
                Self::new(VectorIndex::empty())
            }
        }
    }

    /// The current build.
    pub fn snapshot(&self) -> Arc<VectorIndex> {
        self.current.read().clone()
    }

    /// Swap in a replacement build. Callers persist the new build first so
    /// disk and memory cannot drift apart on failure.
    pub fn replace(&self, index: VectorIndex) {
        *self.current.write() = Arc::new(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::vector_index::IndexEntry;
    use crate::types::document::Chunk;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn one_entry_index(text: &str) -> VectorIndex {
        VectorIndex::build(vec![IndexEntry {
            vector: vec![1.0, 0.0],
            chunk: Chunk::new(Uuid::new_v4(), "a.txt", 0, text, 0, text.len()),
        }])
        .unwrap()
    }

    #[test]
    fn replace_is_visible_to_new_snapshots() {
        let shared = SharedIndex::new(VectorIndex::empty());
        assert!(shared.snapshot().is_empty());

        shared.replace(one_entry_index("hello"));
        assert_eq!(shared.snapshot().len(), 1);
    }

    #[test]
    fn held_snapshots_survive_a_swap() {
        let shared = SharedIndex::new(one_entry_index("old build"));
        let before = shared.snapshot();
        let before_id = before.build_id();

        shared.replace(one_entry_index("new build"));

        assert_eq!(before.build_id(), before_id);
        assert_eq!(before.chunks()[0].text, "old build");
        assert_eq!(shared.snapshot().chunks()[0].text, "new build");
    }

    #[tokio::test]
    async fn missing_artifacts_mean_an_empty_start() {
        let dir = TempDir::new().unwrap();
        let shared = SharedIndex::load_or_empty(dir.path()).await;
        assert!(shared.snapshot().is_empty());
    }

    #[tokio::test]
    async fn corrupt_artifacts_mean_an_empty_start() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(super::super::VECTORS_FILE), b"{")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(super::super::CHUNKS_FILE), b"{")
            .await
            .unwrap();

        let shared = SharedIndex::load_or_empty(dir.path()).await;
        assert!(shared.snapshot().is_empty());
    }

    #[tokio::test]
    async fn persisted_index_is_picked_up_on_start() {
        let dir = TempDir::new().unwrap();
        one_entry_index("persisted").save(dir.path()).await.unwrap();

        let shared = SharedIndex::load_or_empty(dir.path()).await;
        assert_eq!(shared.snapshot().len(), 1);
        assert_eq!(shared.snapshot().chunks()[0].text, "persisted");
    }
}
