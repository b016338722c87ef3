//! Table storage subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → StoreProvider (resolve backend per request)
//!     → TableStore trait (ensure_table / get / upsert)
//!     → memory.rs (in-process, tests and local dev)
//!     → azure.rs  (Azure Table REST API over reqwest)
//! ```
//!
//! # Design Decisions
//! - The trait exposes exactly the three operations the counter needs
//! - NotFound is not an error: `get` returns `Ok(None)`
//! - Upsert carries no If-Match condition; last writer wins
//! - The Azure backend is rebuilt per request from the environment, so a
//!   rotated connection string takes effect without a restart

pub mod azure;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

/// Errors that can occur against a table storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection string missing from the environment or malformed.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure talking to the table service.
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The table service answered with an unexpected status.
    #[error("table service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// An entity payload could not be encoded or decoded.
    #[error("entity serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The single entity this service persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorRecord {
    pub partition_key: String,
    pub row_key: String,
    /// Number of recorded visits.
    pub count: u64,
    /// Opaque concurrency token assigned by the storage layer on reads.
    /// Carried through but never used for conflict detection.
    pub etag: Option<String>,
}

impl VisitorRecord {
    /// A fresh record for the first-ever visit.
    pub fn first(partition_key: &str, row_key: &str) -> Self {
        Self {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            count: 1,
            etag: None,
        }
    }
}

/// Seam between the counter logic and the concrete table backends.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create the backing table if it does not already exist.
    async fn ensure_table(&self) -> StorageResult<()>;

    /// Fetch the record at the given partition/row key. Absence is `None`.
    async fn get(&self, partition_key: &str, row_key: &str)
        -> StorageResult<Option<VisitorRecord>>;

    /// Insert-or-replace the record, unconditionally.
    async fn upsert(&self, record: &VisitorRecord) -> StorageResult<()>;
}

/// Resolves a [`TableStore`] for each request.
///
/// The memory backend is shared so counts accumulate across requests; the
/// Azure backend is constructed fresh per request from the environment,
/// which is where a missing connection string first surfaces.
pub enum StoreProvider {
    Memory(Arc<memory::InMemoryTable>),
    Azure(StorageConfig),
}

impl StoreProvider {
    pub fn from_config(config: &StorageConfig) -> Self {
        match config.backend {
            StorageBackend::Memory => {
                StoreProvider::Memory(Arc::new(memory::InMemoryTable::new()))
            }
            StorageBackend::AzureTable => StoreProvider::Azure(config.clone()),
        }
    }

    /// Resolve the backend for one request.
    pub fn store(&self) -> StorageResult<Arc<dyn TableStore>> {
        match self {
            StoreProvider::Memory(store) => Ok(store.clone()),
            StoreProvider::Azure(config) => {
                let store = azure::AzureTableStore::from_env(config)?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;

    #[test]
    fn memory_provider_hands_out_the_same_store() {
        let provider = StoreProvider::from_config(&StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        });
        let a = provider.store().unwrap();
        let b = provider.store().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn azure_provider_fails_without_a_connection_string() {
        let config = StorageConfig {
            backend: StorageBackend::AzureTable,
            connection_string_env: "VISITOR_COUNTER_UNSET_TEST_VAR".to_string(),
            ..StorageConfig::default()
        };
        let provider = StoreProvider::from_config(&config);
        assert!(matches!(
            provider.store(),
            Err(StorageError::Configuration(_))
        ));
    }
}
