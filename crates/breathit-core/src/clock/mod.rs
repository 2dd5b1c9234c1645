mod engine;
mod phase;

pub use engine::{BreathingClock, ClockState};
pub use phase::{AdvancePolicy, PhaseKind, SessionConfig};
