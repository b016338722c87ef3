//! Thin client for the visitor counter service.

pub mod client;

pub use client::{CounterClient, VisitResponse};
