//! Index persistence as paired JSON artifacts

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::document::Chunk;

use super::vector_index::VectorIndex;

pub const VECTORS_FILE: &str = "vectors.json";
pub const CHUNKS_FILE: &str = "chunks.json";

/// Bumped whenever the artifact layout changes.
const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct VectorArtifactRef<'a> {
    schema_version: u32,
    build_id: Uuid,
    built_at: DateTime<Utc>,
    dimensions: usize,
    vectors: &'a [Vec<f32>],
}

#[derive(Deserialize)]
struct VectorArtifact {
    schema_version: u32,
    build_id: Uuid,
    built_at: DateTime<Utc>,
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChunkArtifactRef<'a> {
    schema_version: u32,
    build_id: Uuid,
    dimensions: usize,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct ChunkArtifact {
    schema_version: u32,
    build_id: Uuid,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Write both artifacts under `dir`. Each file is written to a temp
    /// sibling and renamed into place, so readers never observe a half
    /// written file. The shared build id ties the pair together.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        let vectors_bytes = serde_json::to_vec_pretty(&VectorArtifactRef {
            schema_version: SCHEMA_VERSION,
            build_id: self.build_id(),
            built_at: self.built_at(),
            dimensions: self.dimensions(),
            vectors: self.vectors(),
        })?;
        let chunks_bytes = serde_json::to_vec_pretty(&ChunkArtifactRef {
            schema_version: SCHEMA_VERSION,
            build_id: self.build_id(),
            dimensions: self.dimensions(),
            chunks: self.chunks(),
        })?;

        let vectors_tmp = vectors_path.with_extension("json.tmp");
        let chunks_tmp = chunks_path.with_extension("json.tmp");
        tokio::fs::write(&vectors_tmp, vectors_bytes).await?;
        tokio::fs::write(&chunks_tmp, chunks_bytes).await?;
        tokio::fs::rename(&vectors_tmp, &vectors_path).await?;
        tokio::fs::rename(&chunks_tmp, &chunks_path).await?;

        tracing::debug!(
            "Persisted index {} ({} chunks) to {}",
            self.build_id(),
            self.len(),
            dir.display()
        );
        Ok(())
    }

    /// Read the artifact pair back. `Ok(None)` when neither file exists; any
    /// inconsistency between or within the files is reported as corruption
    /// rather than silently loading a broken index.
    pub async fn load(dir: &Path) -> Result<Option<VectorIndex>> {
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        let vectors_exist = tokio::fs::try_exists(&vectors_path).await?;
        let chunks_exist = tokio::fs::try_exists(&chunks_path).await?;
        match (vectors_exist, chunks_exist) {
            (false, false) => return Ok(None),
            (true, true) => {}
            (true, false) => {
                return Err(Error::index_corruption(format!(
                    "{CHUNKS_FILE} is missing but {VECTORS_FILE} exists"
                )))
            }
            (false, true) => {
                return Err(Error::index_corruption(format!(
                    "{VECTORS_FILE} is missing but {CHUNKS_FILE} exists"
                )))
            }
        }

        let vectors_bytes = tokio::fs::read(&vectors_path).await?;
        let chunks_bytes = tokio::fs::read(&chunks_path).await?;

        let vectors: VectorArtifact = serde_json::from_slice(&vectors_bytes)
            .map_err(|e| Error::index_corruption(format!("unreadable {VECTORS_FILE}: {e}")))?;
        let chunks: ChunkArtifact = serde_json::from_slice(&chunks_bytes)
            .map_err(|e| Error::index_corruption(format!("unreadable {CHUNKS_FILE}: {e}")))?;

        if vectors.schema_version != SCHEMA_VERSION || chunks.schema_version != SCHEMA_VERSION {
            return Err(Error::index_corruption(format!(
                "schema version mismatch: vectors v{}, chunks v{}, expected v{}",
                vectors.schema_version, chunks.schema_version, SCHEMA_VERSION
            )));
        }
        if vectors.build_id != chunks.build_id {
            return Err(Error::index_corruption(format!(
                "artifacts come from different builds: {} vs {}",
                vectors.build_id, chunks.build_id
            )));
        }
        if vectors.dimensions != chunks.dimensions {
            return Err(Error::index_corruption(format!(
                "artifacts disagree on dimensions: {} vs {}",
                vectors.dimensions, chunks.dimensions
            )));
        }
        if vectors.vectors.len() != chunks.chunks.len() {
            return Err(Error::index_corruption(format!(
                "entry count mismatch: {} vectors, {} chunks",
                vectors.vectors.len(),
                chunks.chunks.len()
            )));
        }
        if let Some(bad) = vectors
            .vectors
            .iter()
            .find(|v| v.len() != vectors.dimensions)
        {
            return Err(Error::index_corruption(format!(
                "vector width {} does not match declared dimensions {}",
                bad.len(),
                vectors.dimensions
            )));
        }

        Ok(Some(VectorIndex::from_parts(
            vectors.build_id,
            vectors.built_at,
            vectors.dimensions,
            vectors.vectors,
            chunks.chunks,
        )))
    }
}
