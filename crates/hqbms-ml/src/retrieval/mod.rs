//! Retrieval module for vector search

mod index;

pub use index::{SearchResult, VectorIndex};
