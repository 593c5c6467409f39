//! Circuit breaker for outbound calls.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: testing if dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: after break duration
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails
//! ```
//!
//! # Design Decisions
//! - One breaker per client, not per host
//! - Single probe in Half-Open (prevents hammering a recovering dependency)

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
enum Inner {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen { probe_started: Instant },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    break_duration: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, break_duration: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            break_duration,
            inner: Mutex::new(Inner::Closed { failures: 0 }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { until } if Instant::now() >= until => CircuitState::HalfOpen,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Ask permission to send a request. Every granted permission must be
    /// followed by [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        match *inner {
            Inner::Closed { .. } => true,
            Inner::Open { until } => {
                if Instant::now() >= until {
                    tracing::info!("Circuit half-open, sending probe request");
                    *inner = Inner::HalfOpen { probe_started: Instant::now() };
                    true
                } else {
                    false
                }
            }
            // A probe that never reported back (e.g. cancelled) is replaced
            // once a full break duration has passed.
            Inner::HalfOpen { probe_started } => {
                if probe_started.elapsed() >= self.break_duration {
                    *inner = Inner::HalfOpen { probe_started: Instant::now() };
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if matches!(*inner, Inner::HalfOpen { .. }) {
            tracing::info!("Circuit closed");
        }
        *inner = Inner::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        let trip = match *inner {
            Inner::Closed { failures } => {
                let failures = failures + 1;
                if failures < self.failure_threshold {
                    *inner = Inner::Closed { failures };
                    false
                } else {
                    true
                }
            }
            Inner::HalfOpen { .. } => true,
            Inner::Open { .. } => false,
        };

        if trip {
            tracing::warn!(
                break_secs = self.break_duration.as_secs_f64(),
                "Circuit opened after repeated failures"
            );
            *inner = Inner::Open {
                until: Instant::now() + self.break_duration,
            };
        }
    }
}
