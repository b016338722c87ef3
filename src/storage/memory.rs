//! In-process table backend.
//!
//! Backs tests and local development. Mirrors the table service contract:
//! reads of absent rows are `None`, upserts replace whole records, and a
//! fresh opaque etag is assigned on every write.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::storage::{StorageResult, TableStore, VisitorRecord};

/// Table rows keyed by (partition key, row key).
#[derive(Default)]
pub struct InMemoryTable {
    rows: DashMap<(String, String), VisitorRecord>,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl TableStore for InMemoryTable {
    async fn ensure_table(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> StorageResult<Option<VisitorRecord>> {
        let key = (partition_key.to_string(), row_key.to_string());
        Ok(self.rows.get(&key).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, record: &VisitorRecord) -> StorageResult<()> {
        let key = (record.partition_key.clone(), record.row_key.clone());
        let mut stored = record.clone();
        stored.etag = Some(format!("W/\"{}\"", Uuid::new_v4()));
        self.rows.insert(key, stored);
        Ok(())
    }
}
