//! Health status policy.
//!
//! Translates an aggregate [`HealthState`] into the [`OutcomeCode`] reported
//! by each health endpoint.
//!
//! # Table
//! ```text
//!               Healthy   Degraded           Unhealthy
//! Liveness      Success   Success            Unavailable
//! Readiness     Success   DependencyFailed   Unavailable
//! ```
//!
//! # Design Decisions
//! - Liveness stays successful while degraded so the process can self-heal
//!   instead of being restarted on every transient degradation
//! - Readiness fails while degraded so load drains off the instance
//! - The table is a plain `Copy` value built once at startup; reads need no
//!   synchronization

use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate health classification, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    /// Every recognized state, in severity order.
    pub const ALL: [HealthState; 3] = [
        HealthState::Healthy,
        HealthState::Degraded,
        HealthState::Unhealthy,
    ];

    fn index(self) -> usize {
        match self {
            HealthState::Healthy => 0,
            HealthState::Degraded => 1,
            HealthState::Unhealthy => 2,
        }
    }

    /// The more severe of two states.
    pub fn worst(self, other: HealthState) -> HealthState {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "Healthy",
            HealthState::Degraded => "Degraded",
            HealthState::Unhealthy => "Unhealthy",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational intent of a health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointPurpose {
    /// Should this process be restarted?
    Liveness,
    /// Should this process receive new traffic?
    Readiness,
}

impl EndpointPurpose {
    pub const ALL: [EndpointPurpose; 2] = [EndpointPurpose::Liveness, EndpointPurpose::Readiness];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointPurpose::Liveness => "liveness",
            EndpointPurpose::Readiness => "readiness",
        }
    }
}

impl fmt::Display for EndpointPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abstract result surfaced to callers of a health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeCode {
    Success,
    DependencyFailed,
    Unavailable,
}

impl OutcomeCode {
    /// HTTP status used when the outcome is served over HTTP.
    pub fn status_code(self) -> StatusCode {
        match self {
            OutcomeCode::Success => StatusCode::OK,
            OutcomeCode::DependencyFailed => StatusCode::FAILED_DEPENDENCY,
            OutcomeCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, OutcomeCode::Success)
    }
}

/// Error raised when a policy table is not total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("no outcome configured for {purpose} in state {state}")]
    Missing {
        purpose: EndpointPurpose,
        state: HealthState,
    },
    #[error("outcome for {purpose} in state {state} configured more than once")]
    Duplicate {
        purpose: EndpointPurpose,
        state: HealthState,
    },
}

/// Immutable mapping from (purpose, state) to outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    liveness: [OutcomeCode; 3],
    readiness: [OutcomeCode; 3],
}

impl PolicyTable {
    /// The standard liveness/readiness split.
    pub fn standard() -> Self {
        Self {
            liveness: HealthState::ALL.map(standard_liveness),
            readiness: HealthState::ALL.map(standard_readiness),
        }
    }

    /// Build a table from explicit entries.
    ///
    /// Every (purpose, state) pair must appear exactly once; a partial table
    /// is rejected rather than defaulted.
    pub fn from_entries<I>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (EndpointPurpose, HealthState, OutcomeCode)>,
    {
        let mut liveness = [None; 3];
        let mut readiness = [None; 3];

        for (purpose, state, outcome) in entries {
            let row = match purpose {
                EndpointPurpose::Liveness => &mut liveness,
                EndpointPurpose::Readiness => &mut readiness,
            };
            let slot = &mut row[state.index()];
            if slot.is_some() {
                return Err(PolicyError::Duplicate { purpose, state });
            }
            *slot = Some(outcome);
        }

        Ok(Self {
            liveness: complete_row(EndpointPurpose::Liveness, liveness)?,
            readiness: complete_row(EndpointPurpose::Readiness, readiness)?,
        })
    }

    pub fn outcome(&self, purpose: EndpointPurpose, state: HealthState) -> OutcomeCode {
        match purpose {
            EndpointPurpose::Liveness => self.liveness[state.index()],
            EndpointPurpose::Readiness => self.readiness[state.index()],
        }
    }

    pub fn liveness_outcome(&self, state: HealthState) -> OutcomeCode {
        self.outcome(EndpointPurpose::Liveness, state)
    }

    pub fn readiness_outcome(&self, state: HealthState) -> OutcomeCode {
        self.outcome(EndpointPurpose::Readiness, state)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_liveness(state: HealthState) -> OutcomeCode {
    match state {
        HealthState::Healthy => OutcomeCode::Success,
        HealthState::Degraded => OutcomeCode::Success,
        HealthState::Unhealthy => OutcomeCode::Unavailable,
    }
}

fn standard_readiness(state: HealthState) -> OutcomeCode {
    match state {
        HealthState::Healthy => OutcomeCode::Success,
        HealthState::Degraded => OutcomeCode::DependencyFailed,
        HealthState::Unhealthy => OutcomeCode::Unavailable,
    }
}

fn complete_row(
    purpose: EndpointPurpose,
    row: [Option<OutcomeCode>; 3],
) -> Result<[OutcomeCode; 3], PolicyError> {
    let mut out = [OutcomeCode::Unavailable; 3];
    for state in HealthState::ALL {
        out[state.index()] = row[state.index()].ok_or(PolicyError::Missing { purpose, state })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_is_success_everywhere() {
        let table = PolicyTable::standard();
        assert_eq!(table.liveness_outcome(HealthState::Healthy), OutcomeCode::Success);
        assert_eq!(table.readiness_outcome(HealthState::Healthy), OutcomeCode::Success);
    }

    #[test]
    fn test_degraded_diverges_between_purposes() {
        let table = PolicyTable::standard();
        assert_eq!(table.liveness_outcome(HealthState::Degraded), OutcomeCode::Success);
        assert_eq!(
            table.readiness_outcome(HealthState::Degraded),
            OutcomeCode::DependencyFailed
        );
    }

    #[test]
    fn test_unhealthy_is_unavailable_everywhere() {
        let table = PolicyTable::standard();
        assert_eq!(table.liveness_outcome(HealthState::Unhealthy), OutcomeCode::Unavailable);
        assert_eq!(table.readiness_outcome(HealthState::Unhealthy), OutcomeCode::Unavailable);
    }

    #[test]
    fn test_repeated_queries_are_stable() {
        let table = PolicyTable::standard();
        for purpose in EndpointPurpose::ALL {
            for state in HealthState::ALL {
                let first = table.outcome(purpose, state);
                for _ in 0..10 {
                    assert_eq!(table.outcome(purpose, state), first);
                }
            }
        }
        assert_eq!(table, PolicyTable::standard());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(OutcomeCode::Success.status_code(), StatusCode::OK);
        assert_eq!(OutcomeCode::DependencyFailed.status_code().as_u16(), 424);
        assert_eq!(OutcomeCode::Unavailable.status_code().as_u16(), 503);
    }

    #[test]
    fn test_worst_of() {
        assert_eq!(HealthState::Healthy.worst(HealthState::Degraded), HealthState::Degraded);
        assert_eq!(HealthState::Unhealthy.worst(HealthState::Degraded), HealthState::Unhealthy);
        assert_eq!(HealthState::Healthy.worst(HealthState::Healthy), HealthState::Healthy);
    }

    fn standard_entries() -> Vec<(EndpointPurpose, HealthState, OutcomeCode)> {
        let table = PolicyTable::standard();
        EndpointPurpose::ALL
            .into_iter()
            .flat_map(|p| HealthState::ALL.into_iter().map(move |s| (p, s, table.outcome(p, s))))
            .collect()
    }

    #[test]
    fn test_from_entries_matches_standard() {
        let table = PolicyTable::from_entries(standard_entries()).unwrap();
        assert_eq!(table, PolicyTable::standard());
    }

    #[test]
    fn test_from_entries_rejects_partial_table() {
        let entries: Vec<_> = standard_entries()
            .into_iter()
            .filter(|(p, s, _)| !(*p == EndpointPurpose::Readiness && *s == HealthState::Degraded))
            .collect();

        assert_eq!(
            PolicyTable::from_entries(entries),
            Err(PolicyError::Missing {
                purpose: EndpointPurpose::Readiness,
                state: HealthState::Degraded,
            })
        );
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let mut entries = standard_entries();
        entries.push((EndpointPurpose::Liveness, HealthState::Healthy, OutcomeCode::Unavailable));

        assert_eq!(
            PolicyTable::from_entries(entries),
            Err(PolicyError::Duplicate {
                purpose: EndpointPurpose::Liveness,
                state: HealthState::Healthy,
            })
        );
    }

    #[test]
    fn test_table_is_shareable_across_threads() {
        let table = PolicyTable::standard();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(move || table.readiness_outcome(HealthState::Degraded)))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), OutcomeCode::DependencyFailed);
        }
    }
}
