//! Application state for the ML service

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingBackend, ServiceConfig};
use crate::error::Result;
use crate::estimator::{ModelRegistry, WaitTimeEstimator};
use crate::generation::RagQueryEngine;
use crate::ingestion::{DocumentIngestor, TextChunker};
use crate::providers::{
    hashing::HashingEmbedder,
    local::LocalVectorStore,
    ollama::OllamaProvider,
    EmbeddingProvider, LlmProvider, SampleStore, VectorStoreProvider,
};
use crate::resilience::Deadline;
use crate::storage::SqliteSampleStore;
use crate::types::HealthResponse;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ServiceConfig,
    /// LLM provider, probed by the health check
    llm_provider: Arc<dyn LlmProvider>,
    /// Vector store for chunks
    vector_store: Arc<dyn VectorStoreProvider>,
    /// Observed wait-time samples
    sample_store: Arc<dyn SampleStore>,
    /// Loaded regression model
    registry: Arc<ModelRegistry>,
    ingestor: DocumentIngestor,
    engine: RagQueryEngine,
    estimator: WaitTimeEstimator,
}

/// Externally wired collaborators
pub struct Components {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub sample_store: Arc<dyn SampleStore>,
    pub registry: Arc<ModelRegistry>,
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        tracing::info!(
            "Initializing ML service state (embeddings: {:?}, storage: {})",
            config.embeddings.backend,
            if config.storage.in_memory {
                "memory".to_string()
            } else {
                config.storage.data_dir.display().to_string()
            }
        );

        let (ollama_embedder, llm) =
            OllamaProvider::new(&config.llm, config.embeddings.dimensions)?.split();
        tracing::info!(
            "Ollama client initialized at {} (generation model: {})",
            config.llm.base_url,
            config.llm.generate_model
        );

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::Ollama => Arc::new(ollama_embedder),
            EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.embeddings.dimensions)?),
        };

        let vector_store = Arc::new(LocalVectorStore::from_config(&config.storage)?);
        tracing::info!("Vector index ready ({} chunks)", vector_store.inner().len());

        let sample_store = if config.storage.in_memory {
            SqliteSampleStore::in_memory()?
        } else {
            SqliteSampleStore::open(config.storage.samples_path())?
        };

        let registry = Arc::new(ModelRegistry::new(
            config.wait_time.model_path.clone(),
            config.wait_time.lazy_load,
        ));

        if config.wait_time.load_on_startup {
            match &config.wait_time.model_path {
                Some(_) => {
                    if let Err(e) = registry.load().await {
                        tracing::warn!("Wait-time model not loaded at startup: {}", e);
                    }
                }
                None => tracing::warn!("No wait_time.model_path configured, estimates will be unavailable"),
            }
        }

        Ok(Self::with_components(
            config,
            Components {
                embedder,
                llm: Arc::new(llm),
                vector_store,
                sample_store: Arc::new(sample_store),
                registry,
            },
        ))
    }

    /// Assemble state from already constructed collaborators
    pub fn with_components(config: ServiceConfig, components: Components) -> Self {
        let Components {
            embedder,
            llm,
            vector_store,
            sample_store,
            registry,
        } = components;

        let ingestor = DocumentIngestor::new(
            TextChunker::from_config(&config.chunking),
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
            config.ingest.clone(),
            &config.timeouts,
        );

        let engine = RagQueryEngine::new(
            embedder,
            Arc::clone(&vector_store),
            Arc::clone(&llm),
            config.retrieval.clone(),
            &config.timeouts,
        );

        let estimator = WaitTimeEstimator::new(
            Arc::clone(&registry),
            Arc::clone(&sample_store),
            &config.wait_time,
            &config.timeouts,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                llm_provider: llm,
                vector_store,
                sample_store,
                registry,
                ingestor,
                engine,
                estimator,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn ingestor(&self) -> &DocumentIngestor {
        &self.inner.ingestor
    }

    pub fn engine(&self) -> &RagQueryEngine {
        &self.inner.engine
    }

    pub fn estimator(&self) -> &WaitTimeEstimator {
        &self.inner.estimator
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.inner.registry
    }

    pub fn sample_store(&self) -> &Arc<dyn SampleStore> {
        &self.inner.sample_store
    }

    /// Fresh end-to-end budget for one request
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.inner.config.timeouts.request())
    }

    /// Probe every collaborator
    pub async fn health(&self) -> HealthResponse {
        let budget = self.inner.config.timeouts.health_probe();
        let (ollama_status, vector_index) = tokio::join!(
            probe(budget, self.inner.llm_provider.health_check()),
            probe(budget, self.inner.vector_store.health_check()),
        );
        let models_loaded = self.inner.registry.is_loaded();

        let healthy = models_loaded && ollama_status == ProbeStatus::Ok && vector_index == ProbeStatus::Ok;
        if !healthy {
            tracing::debug!(
                "Service degraded (models_loaded: {}, ollama: {}, index: {})",
                models_loaded,
                ollama_status.as_str(),
                vector_index.as_str()
            );
        }

        HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            models_loaded,
            ollama_status: ollama_status.as_str().to_string(),
            vector_index: vector_index.as_str().to_string(),
        }
    }

    /// Ready when a model is loaded and the index answers
    pub async fn is_ready(&self) -> bool {
        if !self.inner.registry.is_loaded() {
            return false;
        }
        let budget = self.inner.config.timeouts.health_probe();
        probe(budget, self.inner.vector_store.health_check()).await == ProbeStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeStatus {
    Ok,
    Unreachable,
    Timeout,
}

impl ProbeStatus {
    fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::Ok => "ok",
            ProbeStatus::Unreachable => "unreachable",
            ProbeStatus::Timeout => "timeout",
        }
    }
}

async fn probe<F>(budget: Duration, check: F) -> ProbeStatus
where
    F: Future<Output = Result<bool>>,
{
    match tokio::time::timeout(budget, check).await {
        Ok(Ok(true)) => ProbeStatus::Ok,
        Ok(Ok(false)) => ProbeStatus::Unreachable,
        Ok(Err(e)) if e.is_timeout() => ProbeStatus::Timeout,
        Ok(Err(e)) => {
            tracing::debug!("Health probe failed: {}", e);
            ProbeStatus::Unreachable
        }
        Err(_) => ProbeStatus::Timeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_probe_statuses() {
        let budget = Duration::from_millis(50);
        assert_eq!(probe(budget, async { Ok(true) }).await, ProbeStatus::Ok);
        assert_eq!(probe(budget, async { Ok(false) }).await, ProbeStatus::Unreachable);
        assert_eq!(
            probe(budget, async { Err(Error::internal("refused")) }).await,
            ProbeStatus::Unreachable
        );
        assert_eq!(
            probe(budget, async { Err(Error::DependencyTimeout("slow".into())) }).await,
            ProbeStatus::Timeout
        );
        assert_eq!(
            probe(budget, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(true)
            })
            .await,
            ProbeStatus::Timeout
        );
    }
}
