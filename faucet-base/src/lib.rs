//! This crate contains the shared plumbing of the faucet binaries:
//! settings, signer construction, tracing, metrics and the HTTP server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod settings;

mod agent;
pub use agent::*;

/// Prometheus metrics
pub mod metrics;
pub use metrics::*;

/// HTTP server
pub mod server;
