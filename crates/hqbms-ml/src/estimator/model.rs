//! Regression models and the JSON artifact they load from

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// A trained model predicting a wait in minutes from named features
pub trait RegressionModel: Send + Sync {
    /// Raw prediction (may be negative)
    fn predict(&self, features: &BTreeMap<String, f64>) -> Result<f64>;

    /// Version string carried by the artifact
    fn version(&self) -> &str;

    /// Number of features the model reads
    fn feature_count(&self) -> usize;
}

/// Linear regression artifact: `intercept + sum(weight * feature)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub model_version: String,
    pub intercept: f64,
    pub weights: BTreeMap<String, f64>,
}

impl LinearModel {
    /// Parse and validate an artifact
    pub fn from_json(text: &str) -> Result<Self> {
        let model: LinearModel = serde_json::from_str(text)
            .map_err(|e| Error::Model(format!("Invalid model artifact: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Read an artifact from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Model(format!("Cannot read model artifact {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.model_version.trim().is_empty() {
            return Err(Error::Model("model_version must not be empty".to_string()));
        }
        if !self.intercept.is_finite() {
            return Err(Error::Model("intercept must be finite".to_string()));
        }
        if let Some((name, weight)) = self.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(Error::Model(format!("weight for '{}' is not finite: {}", name, weight)));
        }
        Ok(())
    }
}

impl RegressionModel for LinearModel {
    fn predict(&self, features: &BTreeMap<String, f64>) -> Result<f64> {
        let mut total = self.intercept;
        for (name, weight) in &self.weights {
            let value = features
                .get(name)
                .ok_or_else(|| Error::validation(format!("missing feature '{}'", name)))?;
            total += weight * value;
        }
        Ok(total)
    }

    fn version(&self) -> &str {
        &self.model_version
    }

    fn feature_count(&self) -> usize {
        self.weights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "model_version": "2024-06-linear",
        "intercept": 2.0,
        "weights": {"queue_length": 1.5, "active_counters": -2.0}
    }"#;

    fn features(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_linear_prediction() {
        let model = LinearModel::from_json(ARTIFACT).unwrap();
        let prediction = model
            .predict(&features(&[("queue_length", 10.0), ("active_counters", 2.0), ("unused", 9.0)]))
            .unwrap();
        assert_eq!(prediction, 2.0 + 15.0 - 4.0);
        assert_eq!(model.version(), "2024-06-linear");
        assert_eq!(model.feature_count(), 2);
    }

    #[test]
    fn test_missing_feature_is_validation_error() {
        let model = LinearModel::from_json(ARTIFACT).unwrap();
        let result = model.predict(&features(&[("queue_length", 1.0)]));
        assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("active_counters")));
    }

    #[test]
    fn test_invalid_artifacts_rejected() {
        assert!(matches!(LinearModel::from_json("{not json"), Err(Error::Model(_))));
        let empty_version = r#"{"model_version": " ", "intercept": 0.0, "weights": {}}"#;
        assert!(matches!(LinearModel::from_json(empty_version), Err(Error::Model(_))));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, ARTIFACT).unwrap();

        let model = LinearModel::load(&path).await.unwrap();
        assert_eq!(model.intercept, 2.0);

        let missing = LinearModel::load(&dir.path().join("absent.json")).await;
        assert!(matches!(missing, Err(Error::Model(_))));
    }
}
