//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for wait-time samples. Chunk vectors
//! live in `retrieval::VectorIndex`.

mod samples;

pub use samples::SqliteSampleStore;
