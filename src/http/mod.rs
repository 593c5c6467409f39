//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound (server.rs):
//!     Orchestrator probe
//!     → TraceLayer, TimeoutLayer
//!     → health::endpoints (run probes, map through policy)
//!     → status code + JSON report
//!
//! Outbound (client.rs):
//!     Application service
//!     → circuit breaker admits?
//!     → attempt with timeout
//!     → retry transient failures with backoff
//!     → response or ClientError
//! ```

pub mod client;
pub mod server;

pub use client::{ClientError, ResilientClient};
pub use server::HttpServer;
