//! SQLite store for observed wait-time samples

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::SampleStore;
use crate::types::WaitTimeSample;

/// Append-only sample table indexed by queue and completion time
pub struct SqliteSampleStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSampleStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::Database(format!("Failed to open {}: {}", path.display(), e)))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )
        .map_err(|e| Error::Database(format!("Failed to set pragmas: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create a non-persistent store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS wait_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue_id TEXT NOT NULL,
                observed_wait_minutes REAL NOT NULL,
                recorded_at TEXT NOT NULL,
                recorded_us INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_wait_samples_queue
                ON wait_samples(queue_id, recorded_us DESC);
        "#,
        )
        .map_err(|e| Error::Database(format!("Failed to create schema: {}", e)))?;
        Ok(())
    }

    fn append_sync(conn: &Mutex<Connection>, sample: &WaitTimeSample) -> Result<()> {
        conn.lock().execute(
            "INSERT INTO wait_samples (queue_id, observed_wait_minutes, recorded_at, recorded_us)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                sample.queue_id.to_string(),
                sample.observed_wait_minutes,
                sample.recorded_at,
                sample.recorded_at.timestamp_micros(),
            ],
        )?;
        Ok(())
    }

    fn recent_sync(
        conn: &Mutex<Connection>,
        queue_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<WaitTimeSample>> {
        let conn = conn.lock();
        let mut stmt = conn.prepare(
            "SELECT observed_wait_minutes, recorded_at FROM wait_samples
             WHERE queue_id = ?1
             ORDER BY recorded_us DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![queue_id.to_string(), limit as i64], |row| {
            Ok(WaitTimeSample {
                queue_id: *queue_id,
                observed_wait_minutes: row.get(0)?,
                recorded_at: row.get::<_, DateTime<Utc>>(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    fn count_sync(conn: &Mutex<Connection>, queue_id: &Uuid) -> Result<usize> {
        let count: i64 = conn.lock().query_row(
            "SELECT COUNT(*) FROM wait_samples WHERE queue_id = ?1",
            params![queue_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    async fn append(&self, sample: &WaitTimeSample) -> Result<()> {
        sample.validate()?;
        let conn = Arc::clone(&self.conn);
        let sample = sample.clone();
        tokio::task::spawn_blocking(move || Self::append_sync(&conn, &sample)).await?
    }

    async fn recent(&self, queue_id: &Uuid, limit: usize) -> Result<Vec<WaitTimeSample>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = Arc::clone(&self.conn);
        let queue_id = *queue_id;
        tokio::task::spawn_blocking(move || Self::recent_sync(&conn, &queue_id, limit)).await?
    }

    async fn count(&self, queue_id: &Uuid) -> Result<usize> {
        let conn = Arc::clone(&self.conn);
        let queue_id = *queue_id;
        tokio::task::spawn_blocking(move || Self::count_sync(&conn, &queue_id)).await?
    }

    async fn health_check(&self) -> Result<bool> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            conn.lock()
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| true)
                .map_err(Error::from)
        })
        .await?
    }

    fn name(&self) -> &str {
        "sqlite-samples"
    }
}
