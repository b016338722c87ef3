//! Visitor Counter Service Library
//!
//! An HTTP service that increments and reads a visitor counter stored in a
//! cloud table-storage service. Each request ensures the table exists, reads
//! the counter row at a fixed partition/row key, increments it (or starts it
//! at 1), writes it back with last-writer-wins semantics, and answers with
//! JSON plus a fixed CORS header.

pub mod config;
pub mod counter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::CounterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
