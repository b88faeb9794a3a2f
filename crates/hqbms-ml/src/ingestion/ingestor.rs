//! Document ingestion: validate, chunk, embed in parallel, write in order

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{IngestConfig, TimeoutConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::resilience::{call_with_retry, CallPolicy, Deadline};
use crate::types::{DocumentChunk, IngestRequest, IngestResult, IngestStatus};

use super::chunker::TextChunker;

/// Turns raw text into indexed chunks
pub struct DocumentIngestor {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    config: IngestConfig,
    embed_policy: CallPolicy,
    /// Serialises replace and delete per caller-supplied document ID
    document_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl DocumentIngestor {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        config: IngestConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            config,
            embed_policy: CallPolicy::new(timeouts.embed(), timeouts.retry_backoff()),
            document_locks: DashMap::new(),
        }
    }

    /// Ingest an HTTP request body
    pub async fn ingest_request(&self, request: IngestRequest, deadline: &Deadline) -> Result<IngestResult> {
        let doc_id = request.parsed_doc_id()?;
        self.ingest(doc_id, &request.text, request.metadata, deadline).await
    }

    /// Chunk, embed and index one document
    ///
    /// Chunks whose embedding or insert fails are skipped; the returned status
    /// reflects how many were written. An existing `doc_id` is replaced or
    /// rejected according to `ingest.replace_existing`. A replacement with no
    /// chunk ready to write leaves the existing version in place.
    pub async fn ingest(
        &self,
        doc_id: Option<Uuid>,
        raw_text: &str,
        metadata: HashMap<String, String>,
        deadline: &Deadline,
    ) -> Result<IngestResult> {
        self.validate_text(raw_text)?;

        let Some(id) = doc_id else {
            return self.ingest_locked(None, raw_text, metadata, deadline).await;
        };

        let lock = self.document_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.ingest_locked(Some(id), raw_text, metadata, deadline).await
        };
        drop(lock);
        self.release_document_lock(&id);
        result
    }

    async fn ingest_locked(
        &self,
        doc_id: Option<Uuid>,
        raw_text: &str,
        metadata: HashMap<String, String>,
        deadline: &Deadline,
    ) -> Result<IngestResult> {
        let replacing = match doc_id {
            Some(id) if self.store.has_document(&id).await? => {
                if !self.config.replace_existing {
                    return Err(Error::validation(format!("document already exists: {}", id)));
                }
                true
            }
            _ => false,
        };
        let doc_id = doc_id.unwrap_or_else(Uuid::new_v4);

        let chunks = self.chunker.chunk_document(doc_id, raw_text, &metadata);
        let planned = chunks.len();
        tracing::info!("Ingesting document {} ({} chunks)", doc_id, planned);

        let embedded = self.embed_chunks(chunks, deadline).await;

        if replacing {
            let ready = embedded.iter().filter(|chunk| chunk.is_some()).count();
            if ready == 0 || deadline.is_expired() {
                tracing::warn!(
                    "No chunk of document {} is ready to write, keeping the existing version",
                    doc_id
                );
                return Ok(IngestResult {
                    doc_id,
                    chunks_added: 0,
                    status: IngestStatus::Failed,
                });
            }
            let removed = self.store.delete_by_document(&doc_id).await?;
            tracing::info!("Replaced {} existing chunks of document {}", removed, doc_id);
        }

        let mut chunks_added = 0usize;
        for chunk in embedded.into_iter().flatten() {
            if deadline.is_expired() {
                tracing::warn!("Request deadline reached, stopping writes for document {}", doc_id);
                break;
            }
            match self.store.insert_chunk(&chunk).await {
                Ok(_) => chunks_added += 1,
                Err(e) => tracing::warn!(
                    "Skipping chunk {} of document {}: insert failed: {}",
                    chunk.chunk_index,
                    doc_id,
                    e
                ),
            }
        }

        let status = IngestStatus::from_counts(planned, chunks_added);
        tracing::info!(
            "Ingested document {}: {}/{} chunks written ({:?})",
            doc_id,
            chunks_added,
            planned,
            status
        );

        Ok(IngestResult {
            doc_id,
            chunks_added,
            status,
        })
    }

    /// Delete every chunk of a document
    pub async fn delete_document(&self, doc_id: &Uuid) -> Result<usize> {
        let lock = self.document_lock(*doc_id);
        let result = {
            let _guard = lock.lock().await;
            self.delete_locked(doc_id).await
        };
        drop(lock);
        self.release_document_lock(doc_id);
        result
    }

    async fn delete_locked(&self, doc_id: &Uuid) -> Result<usize> {
        if !self.store.has_document(doc_id).await? {
            return Err(Error::NotFound(format!("document {}", doc_id)));
        }
        let deleted = self.store.delete_by_document(doc_id).await?;
        tracing::info!("Deleted {} chunks of document {}", deleted, doc_id);
        Ok(deleted)
    }

    fn document_lock(&self, doc_id: Uuid) -> Arc<Mutex<()>> {
        self.document_locks.entry(doc_id).or_default().clone()
    }

    /// Drop the lock entry once no other caller holds it
    fn release_document_lock(&self, doc_id: &Uuid) {
        self.document_locks
            .remove_if(doc_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn validate_text(&self, raw_text: &str) -> Result<()> {
        if raw_text.trim().is_empty() {
            return Err(Error::validation("text must not be empty"));
        }
        let chars = raw_text.chars().count();
        if chars > self.config.max_document_chars {
            return Err(Error::validation(format!(
                "text is {} characters, limit is {}",
                chars, self.config.max_document_chars
            )));
        }
        Ok(())
    }

    /// Embed with bounded concurrency; output order matches input order
    async fn embed_chunks(&self, chunks: Vec<DocumentChunk>, deadline: &Deadline) -> Vec<Option<DocumentChunk>> {
        let concurrency = self.config.embedding_concurrency();

        stream::iter(chunks)
            .map(|chunk| async move {
                let result = call_with_retry("embedding", deadline, self.embed_policy, || {
                    self.embedder.embed(&chunk.text)
                })
                .await;

                match result {
                    Ok(embedding) => Some(chunk.with_embedding(embedding)),
                    Err(e) => {
                        tracing::warn!(
                            "Skipping chunk {} of document {}: {}",
                            chunk.chunk_index,
                            chunk.doc_id,
                            e
                        );
                        None
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await
    }
}
