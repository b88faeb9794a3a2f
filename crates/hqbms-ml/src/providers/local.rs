//! Local vector store backed by the SQLite vector index
//!
//! `VectorIndex` is synchronous; every call is moved onto the blocking pool.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::retrieval::VectorIndex;
use crate::types::DocumentChunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Local vector store wrapping the SQLite index
pub struct LocalVectorStore {
    index: Arc<VectorIndex>,
}

impl LocalVectorStore {
    /// Create from existing index
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }

    /// Open the on-disk index at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Arc::new(VectorIndex::open(path)?)))
    }

    /// Create a non-persistent store
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(VectorIndex::in_memory()?)))
    }

    /// Create from config
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        if config.in_memory {
            Self::in_memory()
        } else {
            Self::open(config.index_path())
        }
    }

    /// Get underlying index for direct access
    pub fn inner(&self) -> &Arc<VectorIndex> {
        &self.index
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<u64> {
        let index = Arc::clone(&self.index);
        let chunk = chunk.clone();
        tokio::task::spawn_blocking(move || index.insert_chunk(&chunk)).await?
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let index = Arc::clone(&self.index);
        let query = query_embedding.to_vec();

        tokio::task::spawn_blocking(move || {
            let results = index.search(&query, top_k)?;
            Ok(results
                .into_iter()
                .map(|r| VectorSearchResult {
                    chunk: r.chunk,
                    similarity: r.similarity,
                })
                .collect())
        })
        .await?
    }

    async fn delete_by_document(&self, doc_id: &Uuid) -> Result<usize> {
        let index = Arc::clone(&self.index);
        let doc_id = *doc_id;
        tokio::task::spawn_blocking(move || index.delete_by_document(&doc_id)).await?
    }

    async fn has_document(&self, doc_id: &Uuid) -> Result<bool> {
        Ok(self.index.has_document(doc_id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.index.len())
    }

    async fn health_check(&self) -> Result<bool> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.ping().map(|_| true)).await?
    }

    fn name(&self) -> &str {
        "local-sqlite"
    }
}
