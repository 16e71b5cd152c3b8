//! HTTP server for Brain Notes.
//!
//! Exposes the router, configuration loading, logging and metrics setup so
//! the binary and the integration tests build the same application.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
