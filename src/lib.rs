//! Background agent host.
//!
//! Loads layered configuration, installs telemetry, serves liveness and
//! readiness endpoints and runs application services until shutdown.

pub mod config;
pub mod context;
pub mod features;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::AgentConfig;
pub use context::AppContext;
pub use features::FeatureFlags;
pub use health::{HealthState, PolicyTable};
pub use http::{HttpServer, ResilientClient};
pub use lifecycle::{BackgroundService, ServiceHost, Shutdown};
