//! Structured logging.
//!
//! Initializes the tracing subscriber once at startup. `RUST_LOG` takes
//! precedence; otherwise the configured level applies to this crate and a
//! quieter default to the HTTP middleware.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("visitor_counter={default_level},tower_http=info"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
