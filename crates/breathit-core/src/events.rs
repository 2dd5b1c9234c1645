use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{PhaseKind, SessionConfig};

/// Every state change of the clock produces an Event.
/// Observers receive them alongside the snapshot after each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        config: SessionConfig,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        from: PhaseKind,
        to: PhaseKind,
        cycles_completed: u64,
        at: DateTime<Utc>,
    },
    /// Exhale finished; one more full breath is counted.
    CycleCompleted {
        cycles_completed: u64,
        at: DateTime<Utc>,
    },
    /// Total budget ran out.
    SessionCompleted {
        cycles_completed: u64,
        total_ms: u64,
        at: DateTime<Utc>,
    },
    /// Explicit stop before the budget ran out.
    SessionStopped {
        cycles_completed: u64,
        total_remaining_ms: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: PhaseKind,
        running: bool,
        phase_remaining_ms: u64,
        total_remaining_ms: u64,
        phase_progress: f64,
        cycles_completed: u64,
        at: DateTime<Utc>,
    },
}
