//! # Breathit Core Library
//!
//! This library provides the core logic for the Breathit guided-breathing
//! timer. The CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Breathing Clock**: A delta-driven state machine that turns elapsed
//!   time into phase, progress and cycle count. The caller drives it one
//!   frame at a time; it owns no thread.
//! - **Session Driver**: Pulls frames from a time source, feeds the clock
//!   and fans each snapshot out to observers, isolating their failures.
//! - **Observers**: Hold-ending audio cue and completed-session recording.
//! - **Storage**: SQLite practice history and TOML configuration.
//!
//! ## Key Components
//!
//! - [`BreathingClock`]: Core phase-sequencing state machine
//! - [`SessionDriver`]: Frame loop with scoped subscription
//! - [`Database`]: Practice history persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod format;
pub mod observers;
pub mod sounds;
pub mod source;
pub mod storage;

pub use clock::{AdvancePolicy, BreathingClock, ClockState, PhaseKind, SessionConfig};
pub use driver::{ClockObserver, Control, SessionDriver, SessionOutcome, SessionSummary};
pub use error::{ConfigError, CoreError, DatabaseError, ObserverError, ValidationError};
pub use events::Event;
pub use observers::{CompletionRecorder, Cue, CueSink, HistorySink, HoldCue};
pub use source::{IntervalSource, ScriptedSource, TimeSource, VirtualFrameSource};
pub use storage::{Config, Database, HistoryStats, SessionRecord};
