//! hqbms-ml: wait-time estimation and document question answering for the
//! hospital queue system
//!
//! The crate exposes two cores behind an axum HTTP facade:
//! - a wait-time estimator blending a linear regression model with a moving
//!   average over recently observed waits, and
//! - a RAG pipeline that chunks and embeds documents into a SQLite-backed
//!   vector index and answers questions with an Ollama-hosted LLM.

pub mod config;
pub mod error;
pub mod estimator;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod resilience;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use types::{
    document::{DocumentChunk, IngestResult, IngestStatus},
    response::RagAnswer,
    wait_time::{FeatureContext, WaitTimeEstimate, WaitTimeSample},
};
