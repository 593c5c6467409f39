//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! agent.toml → agent.<env>.toml → APP_* → DEV_APP_* (Development only)
//!     → loader.rs (layer & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → shared via Arc<ArcSwap> to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the shared snapshot
//!     → feature flags observe new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only feature flags follow a reload; everything else is read at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use loader::{ConfigError, ConfigSource, Environment};
pub use schema::{
    AgentConfig, HealthConfig, HostConfig, HttpClientConfig, LogFormat, LoggingConfig,
    MetricsConfig, OtlpConfig, TelemetryConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;

/// Atomically swappable configuration snapshot.
pub type SharedConfig = Arc<ArcSwap<AgentConfig>>;

pub fn shared(config: AgentConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
