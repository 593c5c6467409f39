//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → circuit_breaker.rs (fail fast while the dependency is down)
//!     → attempt with per-attempt timeout
//!     → On failure: retries.rs (retryable?) → backoff.rs (how long to wait)
//!     → circuit_breaker.rs (record outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for idempotent requests (GET, HEAD, PUT, DELETE, ...)
//! - Circuit breaker prevents cascading failures

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
