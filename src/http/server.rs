//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the counter and health handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve connections with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::PropagateRequestIdLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::CounterConfig;
use crate::http::handlers::{health, record_visit};
use crate::http::request::RequestIdLayer;
use crate::storage::StoreProvider;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CounterConfig>,
    pub stores: Arc<StoreProvider>,
}

/// HTTP server for the visitor counter.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: CounterConfig) -> Self {
        let stores = Arc::new(StoreProvider::from_config(&config.storage));
        let state = AppState {
            config: Arc::new(config),
            stores,
        };
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.http.request_timeout_secs);
        let route = state.config.http.route.clone();

        Router::new()
            .route(&route, get(record_visit).post(record_visit))
            .route("/health", get(health))
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                // Either an explicit trigger or the coordinator going away
                // ends the serve loop.
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
