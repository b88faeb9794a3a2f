//! Vector index for chunk storage and search
//!
//! Chunks are persisted in SQLite and mirrored in memory for exact cosine
//! search. Writes are serialised on the connection lock, so the mirror is
//! always in insertion (`seq`) order.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::DocumentChunk;

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk (embedding omitted)
    pub chunk: DocumentChunk,
    /// Cosine similarity
    pub similarity: f32,
}

struct IndexedChunk {
    chunk: DocumentChunk,
    norm: f32,
}

/// SQLite-backed vector index with an in-memory search mirror
pub struct VectorIndex {
    conn: Mutex<Connection>,
    entries: RwLock<Vec<IndexedChunk>>,
    /// Mapping from document IDs to chunk IDs
    document_chunks: DashMap<Uuid, Vec<Uuid>>,
    /// Fixed by the first stored chunk
    dimensions: RwLock<Option<usize>>,
}

impl VectorIndex {
    /// Open (or create) the index at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::VectorDb(format!("Failed to open {}: {}", path.display(), e)))?;
        Self::from_connection(conn, true)
    }

    /// Create a non-persistent index
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::VectorDb(format!("Failed to open in-memory index: {}", e)))?;
        Self::from_connection(conn, false)
    }

    fn from_connection(conn: Connection, on_disk: bool) -> Result<Self> {
        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
            "#,
            )
            .map_err(|e| Error::VectorDb(format!("Failed to set pragmas: {}", e)))?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_id TEXT NOT NULL UNIQUE,
                doc_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(doc_id);
        "#,
        )
        .map_err(|e| Error::VectorDb(format!("Failed to create schema: {}", e)))?;

        let index = Self {
            conn: Mutex::new(conn),
            entries: RwLock::new(Vec::new()),
            document_chunks: DashMap::new(),
            dimensions: RwLock::new(None),
        };
        index.load()?;
        Ok(index)
    }

    /// Rebuild the in-memory mirror from the table
    fn load(&self) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT seq, chunk_id, doc_id, chunk_index, text, embedding, metadata
                 FROM chunks ORDER BY seq ASC",
            )
            .map_err(vector_db_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(vector_db_error)?;

        let mut entries = self.entries.write();
        for row in rows {
            let (seq, chunk_id, doc_id, chunk_index, text, blob, metadata) =
                row.map_err(vector_db_error)?;

            let chunk = DocumentChunk {
                chunk_id: parse_uuid(&chunk_id)?,
                doc_id: parse_uuid(&doc_id)?,
                chunk_index: chunk_index as u32,
                text,
                embedding: decode_embedding(&blob)?,
                metadata: serde_json::from_str::<HashMap<String, String>>(&metadata)?,
                seq: seq as u64,
            };

            let mut dimensions = self.dimensions.write();
            if dimensions.is_none() {
                *dimensions = Some(chunk.embedding.len());
            }

            self.document_chunks
                .entry(chunk.doc_id)
                .or_default()
                .push(chunk.chunk_id);
            let norm = l2_norm(&chunk.embedding);
            entries.push(IndexedChunk { chunk, norm });
        }

        if !entries.is_empty() {
            tracing::info!("Vector index loaded {} chunks", entries.len());
        }
        Ok(())
    }

    /// Insert a chunk and return its insertion sequence
    pub fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<u64> {
        if chunk.embedding.is_empty() {
            return Err(Error::VectorDb("Chunk has no embedding".to_string()));
        }

        let metadata = serde_json::to_string(&chunk.metadata)?;

        // Hold the connection lock until the mirror is updated so seq order
        // and the dimension check cover the whole write
        let conn = self.conn.lock();
        let mut dimensions = self.dimensions.write();
        if let Some(expected) = *dimensions {
            if expected != chunk.embedding.len() {
                return Err(Error::VectorDb(format!(
                    "Embedding dimension mismatch: index holds {}, chunk has {}",
                    expected,
                    chunk.embedding.len()
                )));
            }
        }

        conn.execute(
            "INSERT INTO chunks (chunk_id, doc_id, chunk_index, text, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.chunk_id.to_string(),
                chunk.doc_id.to_string(),
                chunk.chunk_index,
                chunk.text,
                encode_embedding(&chunk.embedding),
                metadata,
            ],
        )
        .map_err(vector_db_error)?;
        let seq = conn.last_insert_rowid() as u64;

        let mut stored = chunk.clone();
        stored.seq = seq;
        let norm = l2_norm(&stored.embedding);

        dimensions.get_or_insert(stored.embedding.len());
        self.document_chunks
            .entry(stored.doc_id)
            .or_default()
            .push(stored.chunk_id);
        self.entries.write().push(IndexedChunk { chunk: stored, norm });

        Ok(seq)
    }

    /// Exact cosine search; ties go to the earlier insertion
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query_embedding);
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &IndexedChunk)> = entries
            .iter()
            .filter(|entry| entry.chunk.embedding.len() == query_embedding.len())
            .map(|entry| {
                let similarity = cosine(query_embedding, query_norm, &entry.chunk.embedding, entry.norm);
                (similarity, entry)
            })
            .collect();

        scored.sort_by(|(sim_a, a), (sim_b, b)| {
            sim_b
                .total_cmp(sim_a)
                .then_with(|| a.chunk.seq.cmp(&b.chunk.seq))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(similarity, entry)| {
                let mut chunk = entry.chunk.clone();
                chunk.embedding = Vec::new();
                SearchResult { chunk, similarity }
            })
            .collect())
    }

    /// Delete all chunks for a document
    pub fn delete_by_document(&self, doc_id: &Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute("DELETE FROM chunks WHERE doc_id = ?1", params![doc_id.to_string()])
            .map_err(vector_db_error)?;

        self.entries.write().retain(|entry| entry.chunk.doc_id != *doc_id);
        self.document_chunks.remove(doc_id);

        Ok(deleted)
    }

    /// Whether the document has stored chunks
    pub fn has_document(&self, doc_id: &Uuid) -> bool {
        self.document_chunks
            .get(doc_id)
            .map(|chunks| !chunks.is_empty())
            .unwrap_or(false)
    }

    /// Chunk IDs stored for a document, in insertion order
    pub fn document_chunk_ids(&self, doc_id: &Uuid) -> Vec<Uuid> {
        self.document_chunks
            .get(doc_id)
            .map(|chunks| chunks.clone())
            .unwrap_or_default()
    }

    /// Get chunk count
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Round-trip a trivial query through SQLite
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(vector_db_error)?;
        Ok(())
    }
}

fn vector_db_error(err: rusqlite::Error) -> Error {
    Error::VectorDb(err.to_string())
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::VectorDb(format!("Corrupt id '{}': {}", raw, e)))
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::VectorDb(format!(
            "Corrupt embedding blob of {} bytes",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; zero vectors are similar to nothing
fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / (a_norm * b_norm)).clamp(-1.0, 1.0)
}
