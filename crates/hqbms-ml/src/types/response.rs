//! Response types for RAG queries and service probes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Answer synthesised from retrieved chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Generated answer ("" when nothing relevant was retrieved)
    pub answer: String,
    /// Contributing chunk IDs in retrieval order
    pub sources: Vec<Uuid>,
    /// Retrieval confidence in [0, 1]
    pub confidence: f32,
}

impl RagAnswer {
    /// The defined empty-result state
    pub fn empty() -> Self {
        Self {
            answer: String::new(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Whether nothing relevant was retrieved
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Health probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// Whether a regression model is loaded
    pub models_loaded: bool,
    /// Language model collaborator state: "ok", "unreachable" or "timeout"
    pub ollama_status: String,
    /// Vector index state: "ok", "unreachable" or "timeout"
    pub vector_index: String,
}

/// Result of deleting a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub doc_id: Uuid,
    pub chunks_deleted: usize,
}

/// Metadata about the loaded regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Version string carried by the artifact
    pub model_version: String,
    /// Number of weighted features
    pub features: usize,
}

/// Acknowledgement of a recorded wait-time sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecorded {
    pub queue_id: Uuid,
    /// Samples now stored for this queue
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_answer_shape() {
        let json = serde_json::to_value(RagAnswer::empty()).unwrap();
        assert_eq!(json["answer"], "");
        assert_eq!(json["sources"].as_array().unwrap().len(), 0);
        assert_eq!(json["confidence"], 0.0);
    }

    #[test]
    fn test_sources_serialize_as_strings() {
        let id = Uuid::new_v4();
        let answer = RagAnswer {
            answer: "Yes".to_string(),
            sources: vec![id],
            confidence: 0.8,
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["sources"][0], id.to_string());
    }
}
