//! Wait-time samples, feature context and estimates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Historical observation of a completed wait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitTimeSample {
    /// Queue the patient waited in
    pub queue_id: Uuid,
    /// Observed wait in minutes
    pub observed_wait_minutes: f64,
    /// When the wait completed
    pub recorded_at: DateTime<Utc>,
}

impl WaitTimeSample {
    /// Create a sample recorded now
    pub fn now(queue_id: Uuid, observed_wait_minutes: f64) -> Self {
        Self {
            queue_id,
            observed_wait_minutes,
            recorded_at: Utc::now(),
        }
    }

    /// Reject negative or non-finite waits
    pub fn validate(&self) -> Result<()> {
        if !self.observed_wait_minutes.is_finite() || self.observed_wait_minutes < 0.0 {
            return Err(Error::validation(format!(
                "observed_wait_minutes must be a finite value >= 0, got {}",
                self.observed_wait_minutes
            )));
        }
        Ok(())
    }
}

/// Features describing the current state of a queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureContext {
    /// Patients currently waiting
    pub queue_length: u32,
    /// Counters or staff currently serving the queue
    pub active_counters: u32,
    /// Local hour (0-23)
    pub hour_of_day: u8,
    /// Day of week, Monday = 0
    pub day_of_week: u8,
    /// Additional numeric features understood by the loaded model
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

impl FeatureContext {
    /// Reject out-of-range fields
    pub fn validate(&self) -> Result<()> {
        if self.hour_of_day > 23 {
            return Err(Error::validation(format!(
                "hour_of_day must be in 0..=23, got {}",
                self.hour_of_day
            )));
        }
        if self.day_of_week > 6 {
            return Err(Error::validation(format!(
                "day_of_week must be in 0..=6, got {}",
                self.day_of_week
            )));
        }
        if let Some((name, value)) = self.extra.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::validation(format!(
                "feature '{}' must be finite, got {}",
                name, value
            )));
        }
        Ok(())
    }

    /// Named feature values as seen by the regression model
    pub fn to_features(&self) -> BTreeMap<String, f64> {
        let mut features = self.extra.clone();
        features.insert("queue_length".to_string(), f64::from(self.queue_length));
        features.insert("active_counters".to_string(), f64::from(self.active_counters));
        features.insert("hour_of_day".to_string(), f64::from(self.hour_of_day));
        features.insert("day_of_week".to_string(), f64::from(self.day_of_week));
        features
    }
}

/// Blended wait-time estimate with both components reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitTimeEstimate {
    /// `w * ml_component + (1 - w) * ma_component`
    pub estimate_minutes: f64,
    /// Regression output, clamped at 0
    pub ml_component: f64,
    /// Mean of the most recent samples, 0 when none exist
    pub ma_component: f64,
    /// Samples averaged into `ma_component`
    pub samples_used: usize,
    /// Set when no history backs the MA component
    pub low_confidence: bool,
}

impl WaitTimeEstimate {
    /// Blend the two components with weight `w` on the ML side
    pub fn blend(ml_component: f64, ma_component: f64, w: f64, samples_used: usize) -> Self {
        Self {
            estimate_minutes: w * ml_component + (1.0 - w) * ma_component,
            ml_component,
            ma_component,
            samples_used,
            low_confidence: samples_used == 0,
        }
    }
}
