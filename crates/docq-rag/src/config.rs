//! Configuration for the document Q&A service

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top level configuration, loadable from a TOML file with environment
/// variable overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw).map_err(|e| {
                    Error::configuration(format!("invalid config file '{}': {}", path.display(), e))
                })?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables win over file values. `OPENAI_API_KEY` is the
    /// only way to supply the credential; it is never read from the file.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.embedding.api_key = Some(key);
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring unparseable PORT value: {}", port),
            }
        }
        if let Ok(model) = std::env::var("OPENAI_EMBEDDING_MODEL") {
            if !model.is_empty() {
                self.embedding.model = model;
            }
        }
        if let Ok(model) = std::env::var("OPENAI_CHAT_MODEL") {
            if !model.is_empty() {
                self.generation.model = model;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::configuration("chunking.chunk_size must be positive"));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(Error::configuration(
                "chunking.overlap must be smaller than chunking.chunk_size",
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::configuration("retrieval.top_k must be positive"));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(Error::configuration(
                "retrieval.max_context_chars must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(Error::configuration(
                "retrieval.similarity_threshold must be between 0.0 and 1.0",
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::configuration("embedding.batch_size must be positive"));
        }
        if self.embedding.dimensions == 0 {
            return Err(Error::configuration("embedding.dimensions must be positive"));
        }
        if self.server.max_upload_size == 0 {
            return Err(Error::configuration("server.max_upload_size must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port, overridable with PORT
    pub port: u16,
    /// Request body cap for uploads, in bytes
    pub max_upload_size: usize,
    /// Permissive CORS for browser clients
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 25 * 1024 * 1024, // 25 MiB
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Credential for the embedding and generation services.
    /// Populated from OPENAI_API_KEY, never stored in the file.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// OpenAI compatible API root
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Expected vector width for the model
    pub dimensions: usize,
    /// Texts per embeddings request
    pub batch_size: usize,
    /// Per request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 64,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// OpenAI compatible API root
    pub base_url: String,
    /// Chat model name
    pub model: String,
    /// Sampling temperature, 0.0 keeps answers close to the context
    pub temperature: f32,
    /// Completion length cap
    pub max_tokens: u32,
    /// Per request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over between adjacent chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results returned per query
    pub top_k: usize,
    /// Minimum cosine similarity, 0.0 disables the filter
    pub similarity_threshold: f32,
    /// Character budget for assembled context
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            similarity_threshold: 0.0,
            max_context_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for uploads and the persisted index
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}
