//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the counter
//! service. All types derive Serde traits for deserialization from config
//! files, and every field has a default so a minimal (or absent) config file
//! is enough to run.

use serde::{Deserialize, Serialize};

/// Root configuration for the visitor counter service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CounterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// HTTP surface settings (route, CORS, auth).
    pub http: HttpConfig,

    /// Table storage settings.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Route the counter handler is mounted at.
    pub route: String,

    /// Value of the `Access-Control-Allow-Origin` header on success responses.
    pub allow_origin: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Optional API key. When set, requests must present it in the
    /// `x-api-key` header or the `code` query parameter.
    pub api_key: Option<String>,

    /// Message text returned in the JSON payload.
    pub message: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            route: "/api/visitorcount".to_string(),
            allow_origin: "*".to_string(),
            request_timeout_secs: 30,
            api_key: None,
            message: "Visitor count recorded".to_string(),
        }
    }
}

/// Which table storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// In-process store, for tests and local development.
    Memory,
    /// Azure Table storage over its REST API.
    #[default]
    AzureTable,
}

/// Table storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selector.
    pub backend: StorageBackend,

    /// Table holding the counter row. Created on demand.
    pub table: String,

    /// Partition key of the counter row.
    pub partition_key: String,

    /// Row key of the counter row.
    pub row_key: String,

    /// Name of the environment variable holding the connection string.
    /// Read per request, so a rotated or removed value takes effect without
    /// a restart.
    pub connection_string_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            table: "VisitorCount".to_string(),
            partition_key: "visitor".to_string(),
            row_key: "visitorcount".to_string(),
            connection_string_env: "TABLE_STORAGE_CONNECTION_STRING".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
