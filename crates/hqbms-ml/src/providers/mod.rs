//! Provider abstractions for embeddings, LLM, vector storage and sample storage
//!
//! This module provides trait-based abstractions that allow switching between
//! the Ollama backend and the offline hashing embedder, and substituting
//! in-memory stores in tests.

pub mod embedding;
pub mod llm;
pub mod vector_store;
pub mod sample_store;
pub mod ollama;
pub mod hashing;
pub mod local;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
pub use sample_store::SampleStore;
