//! Configuration for the ML service
//!
//! Loaded from a TOML file, then overridden from the environment, then
//! validated. The chunking parameters and the wait-time blend weight have no
//! built-in defaults and must be present in the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "HQBMS_ML_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Ollama/LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration (required)
    pub chunking: ChunkingConfig,
    /// Ingestion limits and policy
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Wait-time estimator configuration (blend weight required)
    pub wait_time: WaitTimeConfig,
    /// Persistent storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Deadlines and retry backoff
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl ServiceConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, apply environment overrides, validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let mut config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("Invalid configuration in {}: {}", path.display(), e)))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HQBMS_ML_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HQBMS_ML_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("HQBMS_ML_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid HQBMS_ML_PORT '{}': {}", port, e)))?;
        }
        if let Ok(url) = std::env::var("HQBMS_ML_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Ok(path) = std::env::var("HQBMS_ML_MODEL_PATH") {
            self.wait_time.model_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.chunking.overlap_ratio) {
            return Err(Error::Config(format!(
                "chunking.overlap_ratio must be in [0, 1), got {}",
                self.chunking.overlap_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.wait_time.blend_weight) {
            return Err(Error::Config(format!(
                "wait_time.blend_weight must be in [0, 1], got {}",
                self.wait_time.blend_weight
            )));
        }
        if self.wait_time.window == 0 {
            return Err(Error::Config("wait_time.window must be > 0".to_string()));
        }
        if self.ingest.max_document_chars == 0 {
            return Err(Error::Config("ingest.max_document_chars must be > 0".to_string()));
        }
        if self.retrieval.default_top_k == 0 || self.retrieval.default_top_k > self.retrieval.max_top_k {
            return Err(Error::Config(format!(
                "retrieval.default_top_k must be in 1..={}",
                self.retrieval.max_top_k
            )));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.min_similarity) {
            return Err(Error::Config("retrieval.min_similarity must be in [-1, 1]".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.timeouts.request_secs == 0 {
            return Err(Error::Config("timeouts.request_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes (default: 2MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Idle connections kept per host in the shared pool
    pub pool_max_idle_per_host: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            temperature: 0.2,
            pool_max_idle_per_host: 8,
        }
    }
}

/// Which embedding provider to wire
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama `/api/embeddings`
    #[default]
    Ollama,
    /// Offline feature-hashing embedder
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider backend
    pub backend: EmbeddingBackend,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            dimensions: 768,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in grapheme clusters
    pub chunk_size: usize,
    /// Fraction of `chunk_size` repeated from the end of the previous chunk
    pub overlap_ratio: f32,
}

impl ChunkingConfig {
    /// Overlap length in grapheme clusters
    pub fn overlap(&self) -> usize {
        (self.chunk_size as f32 * self.overlap_ratio).floor() as usize
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum document length in characters
    pub max_document_chars: usize,
    /// Concurrent embedding requests per document (default: CPU count, max 8)
    pub parallel_embeddings: Option<usize>,
    /// Replace existing chunks when a known `doc_id` is ingested again
    pub replace_existing: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_document_chars: 200_000,
            parallel_embeddings: None,
            replace_existing: true,
        }
    }
}

impl IngestConfig {
    /// Effective embedding concurrency
    pub fn embedding_concurrency(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved when the request omits `top_k`
    pub default_top_k: usize,
    /// Upper bound accepted for `top_k`
    pub max_top_k: usize,
    /// Minimum cosine similarity for a chunk to count as a match
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 50,
            min_similarity: 0.2,
        }
    }
}

/// Wait-time estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitTimeConfig {
    /// Weight `w` of the ML component; the MA component gets `1 - w`
    pub blend_weight: f64,
    /// Number of most recent samples averaged for the MA component
    #[serde(default = "default_window")]
    pub window: usize,
    /// Path to the regression artifact (JSON)
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Load the artifact when the server starts
    #[serde(default = "default_true")]
    pub load_on_startup: bool,
    /// Load the artifact on first estimate if not loaded yet
    #[serde(default = "default_true")]
    pub lazy_load: bool,
}

fn default_window() -> usize { 10 }
fn default_true() -> bool { true }

/// Persistent storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the SQLite files
    pub data_dir: PathBuf,
    /// Keep everything in memory (nothing survives a restart)
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hqbms-ml");

        Self {
            data_dir,
            in_memory: false,
        }
    }
}

impl StorageConfig {
    /// Vector index database path
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("vectors.db")
    }

    /// Wait-time sample database path
    pub fn samples_path(&self) -> PathBuf {
        self.data_dir.join("samples.db")
    }
}

/// Deadlines and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// End-to-end budget for one request
    pub request_secs: u64,
    /// Per-call limit for a single embedding request
    pub embed_ms: u64,
    /// Per-call limit for a single generation request
    pub generate_secs: u64,
    /// Per-call limit for vector index and sample store operations
    pub storage_ms: u64,
    /// Pause before the single retry of a timed-out call
    pub retry_backoff_ms: u64,
    /// Budget for each health probe
    pub health_probe_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 90,
            embed_ms: 10_000,
            generate_secs: 60,
            storage_ms: 5_000,
            retry_backoff_ms: 250,
            health_probe_ms: 1_500,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn embed(&self) -> Duration {
        Duration::from_millis(self.embed_ms)
    }

    pub fn generate(&self) -> Duration {
        Duration::from_secs(self.generate_secs)
    }

    pub fn storage(&self) -> Duration {
        Duration::from_millis(self.storage_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn health_probe(&self) -> Duration {
        Duration::from_millis(self.health_probe_ms)
    }
}
