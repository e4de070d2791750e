//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `server`: HTTP server exposing metrics and probes

pub mod metrics;
pub mod server;

pub use metrics::*;
