//! Historical wait-time sample store trait

use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Result;
use crate::types::WaitTimeSample;

/// Append-only store of observed waits
///
/// Implementations:
/// - `SqliteSampleStore`: SQLite table indexed by queue and time
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Append one observation
    async fn append(&self, sample: &WaitTimeSample) -> Result<()>;

    /// Most recent samples for a queue, newest first, at most `limit`
    async fn recent(&self, queue_id: &Uuid, limit: usize) -> Result<Vec<WaitTimeSample>>;

    /// Number of samples stored for a queue
    async fn count(&self, queue_id: &Uuid) -> Result<usize>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get store name for logging
    fn name(&self) -> &str;
}
