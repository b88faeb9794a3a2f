//! Core types for the ML service

pub mod document;
pub mod query;
pub mod response;
pub mod wait_time;

pub use document::{DocumentChunk, IngestResult, IngestStatus};
pub use query::{IngestRequest, PredictRequest, QueryRequest, SampleRequest};
pub use response::{DeleteDocumentResponse, HealthResponse, ModelInfo, RagAnswer, SampleRecorded};
pub use wait_time::{FeatureContext, WaitTimeEstimate, WaitTimeSample};
