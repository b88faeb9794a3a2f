//! Holds the currently loaded regression model

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::ModelInfo;

use super::model::{LinearModel, RegressionModel};

/// Atomically swappable model slot
pub struct ModelRegistry {
    artifact_path: Option<PathBuf>,
    lazy_load: bool,
    current: RwLock<Option<Arc<dyn RegressionModel>>>,
    /// Serialises loads so concurrent first requests read the file once
    load_lock: tokio::sync::Mutex<()>,
}

impl ModelRegistry {
    pub fn new(artifact_path: Option<PathBuf>, lazy_load: bool) -> Self {
        Self {
            artifact_path,
            lazy_load,
            current: RwLock::new(None),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Registry with nothing to load; models arrive through `install`
    pub fn empty() -> Self {
        Self::new(None, false)
    }

    /// Load the artifact and swap it in
    ///
    /// On failure the previously loaded model (if any) stays active.
    pub async fn load(&self) -> Result<ModelInfo> {
        let path = self.configured_path()?;
        let _guard = self.load_lock.lock().await;
        self.load_from(path).await
    }

    /// Current model, loading it on first use when lazy loading is enabled
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn RegressionModel>> {
        if let Some(model) = self.current() {
            return Ok(model);
        }

        let path = match (&self.artifact_path, self.lazy_load) {
            (Some(path), true) => path,
            _ => return Err(Error::not_ready("no wait-time model is loaded")),
        };

        let _guard = self.load_lock.lock().await;
        if let Some(model) = self.current() {
            return Ok(model);
        }

        match self.load_from(path).await {
            Ok(_) => self
                .current()
                .ok_or_else(|| Error::not_ready("no wait-time model is loaded")),
            Err(e) => {
                tracing::warn!("Lazy model load failed: {}", e);
                Err(Error::not_ready(format!("wait-time model unavailable: {}", e)))
            }
        }
    }

    fn configured_path(&self) -> Result<&Path> {
        self.artifact_path
            .as_deref()
            .ok_or_else(|| Error::Config("wait_time.model_path is not configured".to_string()))
    }

    /// Read and install the artifact; callers hold `load_lock`
    async fn load_from(&self, path: &Path) -> Result<ModelInfo> {
        let model = LinearModel::load(path).await?;
        tracing::info!(
            "Loaded wait-time model {} ({} features) from {}",
            model.model_version,
            model.weights.len(),
            path.display()
        );
        Ok(self.install(Arc::new(model)))
    }

    /// Swap in a model and describe it
    pub fn install(&self, model: Arc<dyn RegressionModel>) -> ModelInfo {
        let info = ModelInfo {
            model_version: model.version().to_string(),
            features: model.feature_count(),
        };
        *self.current.write() = Some(model);
        info
    }

    pub fn current(&self) -> Option<Arc<dyn RegressionModel>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Description of the loaded model
    pub fn info(&self) -> Option<ModelInfo> {
        self.current().map(|model| ModelInfo {
            model_version: model.version().to_string(),
            features: model.feature_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn write_artifact(dir: &std::path::Path, version: &str) -> PathBuf {
        let path = dir.join("model.json");
        let body = format!(
            r#"{{"model_version": "{}", "intercept": 1.0, "weights": {{"queue_length": 2.0}}}}"#,
            version
        );
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_marks_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(Some(write_artifact(dir.path(), "v1")), false);
        assert!(!registry.is_loaded());

        let info = registry.load().await.unwrap();
        assert_eq!(info.model_version, "v1");
        assert_eq!(info.features, 1);
        assert!(registry.is_loaded());
    }

    #[tokio::test]
    async fn test_invalid_artifact_keeps_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "v1");
        let registry = ModelRegistry::new(Some(path.clone()), false);
        registry.load().await.unwrap();

        std::fs::write(&path, "{ broken").unwrap();
        assert!(registry.load().await.is_err());
        assert_eq!(registry.info().unwrap().model_version, "v1");
    }

    #[tokio::test]
    async fn test_lazy_load_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(Some(write_artifact(dir.path(), "lazy")), true);

        let model = registry.ensure_loaded().await.unwrap();
        let mut features = BTreeMap::new();
        features.insert("queue_length".to_string(), 3.0);
        assert_eq!(model.predict(&features).unwrap(), 7.0);
        assert!(registry.is_loaded());
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ModelRegistry::new(Some(write_artifact(dir.path(), "shared")), true));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.ensure_loaded().await.unwrap() })
            })
            .collect();

        let mut models = Vec::new();
        for handle in handles {
            models.push(handle.await.unwrap());
        }

        let first = registry.current().unwrap();
        assert!(models.iter().all(|model| Arc::ptr_eq(model, &first)));
    }

    #[tokio::test]
    async fn test_not_ready_without_model() {
        let registry = ModelRegistry::empty();
        assert!(matches!(registry.ensure_loaded().await, Err(Error::NotReady(_))));

        let dir = tempfile::tempdir().unwrap();
        let missing = ModelRegistry::new(Some(dir.path().join("absent.json")), true);
        assert!(matches!(missing.ensure_loaded().await, Err(Error::NotReady(_))));
        assert!(!missing.is_loaded());
    }

    #[tokio::test]
    async fn test_load_without_path_is_config_error() {
        let registry = ModelRegistry::empty();
        assert!(matches!(registry.load().await, Err(Error::Config(_))));
    }
}
