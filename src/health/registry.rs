//! Probe registration and aggregation.
//!
//! # Responsibilities
//! - Hold the named probes registered at startup
//! - Run every probe concurrently under a per-probe deadline
//! - Reduce individual results to one [`HealthState`] (worst-of-all)

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::{join_all, BoxFuture};
use serde::Serialize;
use thiserror::Error;

use crate::config::HealthConfig;
use crate::health::policy::HealthState;

/// Result of a single probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub state: HealthState,
    pub description: Option<String>,
}

impl CheckResult {
    pub fn healthy() -> Self {
        Self {
            state: HealthState::Healthy,
            description: None,
        }
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            state: HealthState::Degraded,
            description: Some(description.into()),
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            description: Some(description.into()),
        }
    }
}

/// A named health probe.
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self) -> BoxFuture<'_, CheckResult>;
}

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("health check '{0}' is already registered")]
    DuplicateCheck(String),
}

/// Per-probe entry of a [`HealthReport`].
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration_ms: u64,
}

/// Outcome of running every registered probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub total_duration_ms: u64,
    pub entries: BTreeMap<String, EntryReport>,
}

/// The set of probes consulted by the health endpoints.
pub struct HealthRegistry {
    checks: Vec<Arc<dyn HealthCheck>>,
    timeout: Duration,
}

impl HealthRegistry {
    /// Create an empty registry; each probe gets `timeout` to answer.
    pub fn new(timeout: Duration) -> Self {
        Self {
            checks: Vec::new(),
            timeout,
        }
    }

    pub fn register<C>(&mut self, check: C) -> Result<(), HealthError>
    where
        C: HealthCheck + 'static,
    {
        if self.checks.iter().any(|c| c.name() == check.name()) {
            return Err(HealthError::DuplicateCheck(check.name().to_string()));
        }
        tracing::debug!(check = check.name(), "Health check registered");
        self.checks.push(Arc::new(check));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run all probes and aggregate their results.
    pub async fn check_all(&self) -> HealthReport {
        let started = Instant::now();

        let runs = self.checks.iter().map(|check| async move {
            let begun = Instant::now();
            let result = match tokio::time::timeout(self.timeout, check.check()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        check = check.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Health check timed out"
                    );
                    CheckResult::unhealthy(format!("timed out after {:?}", self.timeout))
                }
            };

            let entry = EntryReport {
                status: result.state,
                description: result.description,
                duration_ms: begun.elapsed().as_millis() as u64,
            };
            (check.name().to_string(), entry)
        });

        let entries: BTreeMap<String, EntryReport> = join_all(runs).await.into_iter().collect();
        let status = aggregate(entries.values().map(|e| e.status));

        HealthReport {
            status,
            total_duration_ms: started.elapsed().as_millis() as u64,
            entries,
        }
    }
}

/// Registry the agent starts with: configured timeout, no built-in probes.
///
/// Dependency probes are application concerns and are registered on the
/// returned registry by the embedding code.
pub fn default_registry(config: &HealthConfig) -> HealthRegistry {
    HealthRegistry::new(config.check_timeout())
}

/// Worst-of-all reduction. No results means healthy.
pub fn aggregate<I>(states: I) -> HealthState
where
    I: IntoIterator<Item = HealthState>,
{
    states.into_iter().fold(HealthState::Healthy, HealthState::worst)
}
