//! Wait-time estimation blending the regression model with recent history

use std::sync::Arc;
use uuid::Uuid;

use crate::config::{TimeoutConfig, WaitTimeConfig};
use crate::error::{Error, Result};
use crate::providers::SampleStore;
use crate::resilience::{call_with_retry, CallPolicy, Deadline};
use crate::types::{FeatureContext, WaitTimeEstimate, WaitTimeSample};

use super::registry::ModelRegistry;

/// Arithmetic mean of the observed waits, 0 for no samples
pub fn moving_average(samples: &[WaitTimeSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.observed_wait_minutes).sum::<f64>() / samples.len() as f64
}

pub struct WaitTimeEstimator {
    registry: Arc<ModelRegistry>,
    samples: Arc<dyn SampleStore>,
    blend_weight: f64,
    window: usize,
    lookup_policy: CallPolicy,
}

impl WaitTimeEstimator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        samples: Arc<dyn SampleStore>,
        config: &WaitTimeConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            registry,
            samples,
            blend_weight: config.blend_weight,
            window: config.window,
            lookup_policy: CallPolicy::new(timeouts.storage(), timeouts.retry_backoff()),
        }
    }

    /// Estimate the wait for `queue_id` in its current state
    ///
    /// Never writes samples. Fails with `NotReady` when no model is loaded.
    pub async fn estimate(
        &self,
        queue_id: Uuid,
        context: &FeatureContext,
        deadline: &Deadline,
    ) -> Result<WaitTimeEstimate> {
        context.validate()?;

        let model = self.registry.ensure_loaded().await?;
        let raw = model.predict(&context.to_features())?;
        if !raw.is_finite() {
            return Err(Error::Model(format!(
                "model {} produced a non-finite prediction",
                model.version()
            )));
        }
        let ml_component = if raw < 0.0 {
            tracing::warn!(
                "Model {} predicted {:.3} minutes for queue {}, clamping to 0",
                model.version(),
                raw,
                queue_id
            );
            0.0
        } else {
            raw
        };

        let recent = call_with_retry("sample lookup", deadline, self.lookup_policy, || {
            self.samples.recent(&queue_id, self.window)
        })
        .await?;
        let ma_component = moving_average(&recent);

        if recent.is_empty() {
            tracing::debug!("No wait history for queue {}, estimate is low confidence", queue_id);
        }

        Ok(WaitTimeEstimate::blend(
            ml_component,
            ma_component,
            self.blend_weight,
            recent.len(),
        ))
    }
}
