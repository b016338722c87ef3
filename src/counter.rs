//! The visitor counter itself.
//!
//! One linear flow per visit: ensure the table exists, read the counter row,
//! increment it (or initialize it to 1), write it back. The write is an
//! unconditional upsert, so two concurrent visits can read the same count
//! and both persist N+1, losing one update. That matches the table-storage
//! semantics this service was built around and is demonstrated, not hidden,
//! by the tests.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::storage::{StorageResult, TableStore, VisitorRecord};

/// Read-increment-write over a [`TableStore`].
pub struct VisitorCounter {
    store: Arc<dyn TableStore>,
    partition_key: String,
    row_key: String,
}

impl VisitorCounter {
    pub fn new(store: Arc<dyn TableStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            partition_key: config.partition_key.clone(),
            row_key: config.row_key.clone(),
        }
    }

    /// Record one visit and return the resulting count.
    pub async fn record_visit(&self) -> StorageResult<u64> {
        self.store.ensure_table().await?;

        let record = match self.store.get(&self.partition_key, &self.row_key).await? {
            Some(mut existing) => {
                existing.count += 1;
                existing
            }
            None => VisitorRecord::first(&self.partition_key, &self.row_key),
        };

        self.store.upsert(&record).await?;

        tracing::debug!(
            partition_key = %self.partition_key,
            row_key = %self.row_key,
            count = record.count,
            "visit recorded"
        );

        Ok(record.count)
    }
}
