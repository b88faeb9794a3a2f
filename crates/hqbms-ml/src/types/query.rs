//! Request body schemas for the HTTP endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::wait_time::{FeatureContext, WaitTimeSample};
use crate::error::{Error, Result};

/// Body of `POST /rag/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
    /// Number of chunks to retrieve (default from config)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Body of `POST /rag/ingest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Document ID; generated when absent or empty
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Raw document text
    pub text: String,
    /// Metadata copied onto every chunk
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IngestRequest {
    /// Parse the optional document ID
    pub fn parsed_doc_id(&self) -> Result<Option<Uuid>> {
        match self.doc_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|e| Error::validation(format!("doc_id '{}' is not a UUID: {}", raw, e))),
        }
    }
}

/// Body of `POST /predict/waittime`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Queue to estimate
    pub queue_id: Uuid,
    /// Current queue features
    #[serde(flatten)]
    pub context: FeatureContext,
}

/// Body of `POST /predict/waittime/samples`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRequest {
    pub queue_id: Uuid,
    pub observed_wait_minutes: f64,
    /// Completion time (default: now)
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl SampleRequest {
    pub fn into_sample(self) -> WaitTimeSample {
        WaitTimeSample {
            queue_id: self.queue_id,
            observed_wait_minutes: self.observed_wait_minutes,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_doc_id_means_generate() {
        let request: IngestRequest =
            serde_json::from_str(r#"{"doc_id": "", "text": "hello"}"#).unwrap();
        assert_eq!(request.parsed_doc_id().unwrap(), None);

        let request: IngestRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(request.parsed_doc_id().unwrap(), None);
    }

    #[test]
    fn test_bad_doc_id_rejected() {
        let request: IngestRequest =
            serde_json::from_str(r#"{"doc_id": "not-a-uuid", "text": "hello"}"#).unwrap();
        assert!(matches!(request.parsed_doc_id(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_predict_request_flattens_context() {
        let queue_id = Uuid::new_v4();
        let body = format!(
            r#"{{"queue_id": "{}", "queue_length": 8, "active_counters": 2,
                "hour_of_day": 14, "day_of_week": 3, "extra": {{"walk_ins": 1.0}}}}"#,
            queue_id
        );
        let request: PredictRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(request.queue_id, queue_id);
        assert_eq!(request.context.queue_length, 8);
        assert_eq!(request.context.extra["walk_ins"], 1.0);
    }
}
