//! Shared utilities for integration testing.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use visitor_counter::config::{CounterConfig, StorageBackend};
use visitor_counter::http::HttpServer;
use visitor_counter::lifecycle::Shutdown;

/// A config wired to the in-process backend, metrics off.
#[allow(dead_code)]
pub fn memory_config() -> CounterConfig {
    let mut config = CounterConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config.observability.metrics_enabled = false;
    config
}

/// Boot the service on an ephemeral port. The server drains when the given
/// [`Shutdown`] triggers or drops, so keep it alive for the test's duration.
pub async fn start_server(config: CounterConfig, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config);
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    addr
}
