//! Stock observers: audio cueing and history recording.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{ClockState, SessionConfig};
use crate::driver::{ClockObserver, Control};
use crate::error::{DatabaseError, ObserverError};
use crate::events::Event;
use crate::storage::{Database, SessionRecord};

/// Default lead time for the hold-ending cue.
pub const DEFAULT_HOLD_CUE_THRESHOLD: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// A hold phase is about to end.
    HoldEnding,
    /// The whole session ran out.
    SessionComplete,
}

/// Somewhere cues get played.
pub trait CueSink {
    fn play(&mut self, cue: Cue) -> Result<(), ObserverError>;
}

impl<F> CueSink for F
where
    F: FnMut(Cue) -> Result<(), ObserverError>,
{
    fn play(&mut self, cue: Cue) -> Result<(), ObserverError> {
        self(cue)
    }
}

/// Plays [`Cue::HoldEnding`] once per hold phase when its remaining time
/// drops below the threshold, and [`Cue::SessionComplete`] on completion.
pub struct HoldCue<S> {
    sink: S,
    threshold: Duration,
    armed: bool,
}

impl<S: CueSink> HoldCue<S> {
    pub fn new(sink: S) -> Self {
        Self::with_threshold(sink, DEFAULT_HOLD_CUE_THRESHOLD)
    }

    pub fn with_threshold(sink: S, threshold: Duration) -> Self {
        Self {
            sink,
            threshold,
            armed: false,
        }
    }
}

impl<S: CueSink> ClockObserver for HoldCue<S> {
    fn name(&self) -> &str {
        "hold-cue"
    }

    fn observe(
        &mut self,
        state: &ClockState,
        events: &[Event],
        _control: &mut Control,
    ) -> Result<(), ObserverError> {
        for event in events {
            match event {
                Event::SessionStarted { .. } | Event::PhaseChanged { .. } => self.armed = true,
                Event::SessionCompleted { .. } => return self.sink.play(Cue::SessionComplete),
                _ => {}
            }
        }

        if self.armed
            && state.running
            && state.phase.is_hold()
            && state.phase_remaining < self.threshold
        {
            self.armed = false;
            return self.sink.play(Cue::HoldEnding);
        }
        Ok(())
    }
}

/// Destination for finished-session records.
pub trait HistorySink {
    fn append(&mut self, record: &SessionRecord) -> Result<(), DatabaseError>;
}

impl HistorySink for Database {
    fn append(&mut self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.record_session(record)
    }
}

impl HistorySink for &Database {
    fn append(&mut self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.record_session(record)
    }
}

impl HistorySink for Vec<SessionRecord> {
    fn append(&mut self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Appends one [`SessionRecord`] when a session runs out its budget.
///
/// Explicitly stopped sessions are not recorded.
pub struct CompletionRecorder<S> {
    sink: S,
    config: Option<SessionConfig>,
    recorded: bool,
}

impl<S: HistorySink> CompletionRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            config: None,
            recorded: false,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: HistorySink> ClockObserver for CompletionRecorder<S> {
    fn name(&self) -> &str {
        "completion-recorder"
    }

    fn observe(
        &mut self,
        _state: &ClockState,
        events: &[Event],
        _control: &mut Control,
    ) -> Result<(), ObserverError> {
        for event in events {
            match event {
                Event::SessionStarted { config, .. } => {
                    self.config = Some(*config);
                    self.recorded = false;
                }
                Event::SessionCompleted {
                    cycles_completed, ..
                } if !self.recorded => {
                    let Some(config) = self.config else {
                        continue;
                    };
                    // Marked before the write so a failing store is not retried every tick.
                    self.recorded = true;
                    let record = SessionRecord::from_config(&config, *cycles_completed);
                    self.sink.append(&record)?;
                    tracing::info!(id = %record.id, cycles = record.cycles, "session saved to history");
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{BreathingClock, PhaseKind};
    use crate::driver::SessionDriver;
    use crate::source::ScriptedSource;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn hold_cue_fires_once_per_hold_phase() {
        let mut cues = Vec::new();
        {
            let sink = |cue: Cue| -> Result<(), ObserverError> {
                cues.push(cue);
                Ok(())
            };
            let config = SessionConfig::new(1_000, 1_000, 1_000, 4_000).unwrap();
            let mut clock = BreathingClock::new();
            SessionDriver::new()
                .with_observer(HoldCue::new(sink))
                .run(&mut clock, config, ScriptedSource::from_deltas(vec![ms(100); 40]));
        }
        assert_eq!(
            cues,
            vec![Cue::HoldEnding, Cue::HoldEnding, Cue::SessionComplete]
        );
    }

    #[test]
    fn hold_cue_ignores_inhale_and_exhale() {
        let mut played = 0;
        let mut cue = HoldCue::new(|_: Cue| -> Result<(), ObserverError> {
            played += 1;
            Ok(())
        });
        let mut state = ClockState {
            phase: PhaseKind::Exhale,
            running: true,
            phase_remaining: ms(100),
            total_remaining: ms(10_000),
            cycles_completed: 0,
            phase_duration: ms(4_000),
        };
        let started = Event::SessionStarted {
            config: SessionConfig::default(),
            at: chrono::Utc::now(),
        };
        cue.observe(&state, &[started], &mut Control::default()).unwrap();
        state.phase = PhaseKind::Inhale;
        cue.observe(&state, &[], &mut Control::default()).unwrap();
        drop(cue);
        assert_eq!(played, 0);
    }

    #[test]
    fn recorder_saves_completed_session_once() {
        let config = SessionConfig::new(1_000, 1_000, 1_000, 5_000).unwrap();
        let mut clock = BreathingClock::new();
        let mut recorder = CompletionRecorder::new(Vec::new());
        {
            let mut driver = SessionDriver::new().with_observer(&mut recorder);
            driver.run(&mut clock, config, ScriptedSource::from_deltas(vec![ms(500); 10]));
        }
        let records = recorder.into_sink();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cycles, 1);
        assert_eq!(records[0].total_ms, 5_000);
        assert_eq!(records[0].hold_ms, 1_000);
    }

    #[test]
    fn recorder_skips_stopped_session() {
        let config = SessionConfig::new(1_000, 1_000, 1_000, 5_000).unwrap();
        let mut clock = BreathingClock::new();
        let mut recorder = CompletionRecorder::new(Vec::new());
        {
            let mut driver = SessionDriver::new().with_observer(&mut recorder);
            driver.run(&mut clock, config, ScriptedSource::from_deltas(vec![ms(500); 3]));
        }
        assert!(recorder.into_sink().is_empty());
    }

    #[test]
    fn recorder_writes_to_database() {
        let db = Database::open_memory().unwrap();
        let config = SessionConfig::new(1_000, 1_000, 1_000, 4_000).unwrap();
        let mut clock = BreathingClock::new();
        SessionDriver::new()
            .with_observer(CompletionRecorder::new(&db))
            .run(&mut clock, config, ScriptedSource::from_deltas([ms(4_000)]));
        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_cycles, 0);
    }
}
