//! Document chunk and ingest result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A bounded span of a source document stored with its embedding
///
/// Immutable once written; owned by the vector index and removed only when
/// its parent document is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique chunk ID
    pub chunk_id: Uuid,
    /// Parent document ID
    pub doc_id: Uuid,
    /// Position of this chunk within its document
    pub chunk_index: u32,
    /// Chunk text
    pub text: String,
    /// Embedding vector
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Insertion sequence assigned by the index (0 until written)
    #[serde(default)]
    pub seq: u64,
}

impl DocumentChunk {
    /// Create a chunk without an embedding yet
    pub fn new(doc_id: Uuid, chunk_index: u32, text: String) -> Self {
        Self {
            chunk_id: Uuid::new_v4(),
            doc_id,
            chunk_index,
            text,
            embedding: Vec::new(),
            metadata: HashMap::new(),
            seq: 0,
        }
    }

    /// Attach caller metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach the embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Coverage of an ingest call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    /// Every chunk was embedded and written
    Success,
    /// Some chunks were skipped
    Partial,
    /// No chunk was written
    Failed,
}

impl IngestStatus {
    /// Derive the status from how many chunks were planned and written
    pub fn from_counts(planned: usize, written: usize) -> Self {
        if written == 0 {
            Self::Failed
        } else if written < planned {
            Self::Partial
        } else {
            Self::Success
        }
    }
}

/// Result of one ingest call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    /// Document the chunks belong to
    pub doc_id: Uuid,
    /// Chunks durably written by this call
    pub chunks_added: usize,
    /// Coverage status
    pub status: IngestStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_counts() {
        assert_eq!(IngestStatus::from_counts(3, 3), IngestStatus::Success);
        assert_eq!(IngestStatus::from_counts(3, 2), IngestStatus::Partial);
        assert_eq!(IngestStatus::from_counts(3, 0), IngestStatus::Failed);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let result = IngestResult {
            doc_id: Uuid::nil(),
            chunks_added: 1,
            status: IngestStatus::Success,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["chunks_added"], 1);
        assert_eq!(json["doc_id"], Uuid::nil().to_string());
    }
}
