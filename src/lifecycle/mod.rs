//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Telemetry → Health server → host.rs starts services
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.rs trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → every ShutdownSignal wakes
//!     → host.rs stops services (bounded by timeout)
//!     → health server drains → telemetry flush → exit
//! ```
//!
//! # Design Decisions
//! - One broadcast shutdown flag; late subscribers still see it
//! - Shutdown has timeout: tasks are aborted after the deadline

pub mod host;
pub mod shutdown;
pub mod signals;

pub use host::{BackgroundService, HostError, ServiceError, ServiceHost};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
