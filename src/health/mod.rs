//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health or /ready (endpoints.rs)
//!     → registry.rs runs every probe (each bounded by a timeout)
//!     → aggregate: worst state wins, no probes = Healthy
//!     → policy.rs maps (endpoint, state) → outcome code
//!     → status code + JSON report
//! ```
//!
//! # Design Decisions
//! - The policy table is plain data, fixed at startup and shared by copy
//! - Degraded keeps the process alive but takes it out of rotation
//! - A probe that times out counts as Unhealthy

pub mod endpoints;
pub mod policy;
pub mod registry;

pub use endpoints::{health_router, HealthEndpoints};
pub use policy::{EndpointPurpose, HealthState, OutcomeCode, PolicyError, PolicyTable};
pub use registry::{aggregate, default_registry, CheckResult, HealthCheck, HealthError, HealthRegistry, HealthReport};
