//! Session runner: pulls frames from a [`TimeSource`], feeds the clock and
//! publishes every tick to a list of observers.
//!
//! Observers are isolated from the tick loop. An observer returning an
//! error, or panicking, is logged and skipped for that tick; the clock
//! keeps advancing. The clock's subscription is released on every exit
//! path, including unwinding out of the time source.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::clock::{BreathingClock, ClockState, PhaseKind, SessionConfig};
use crate::error::ObserverError;
use crate::events::Event;
use crate::source::TimeSource;

/// Reaction hook handed to observers while they handle a tick.
#[derive(Debug, Default)]
pub struct Control {
    stop_requested: bool,
}

impl Control {
    /// Stop the session once the current tick has been published.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }
}

/// Consumer of clock snapshots.
pub trait ClockObserver {
    /// Name used in logs when the observer fails.
    fn name(&self) -> &str {
        "observer"
    }

    /// Called after `start()`, after every tick and after an explicit stop.
    fn observe(
        &mut self,
        state: &ClockState,
        events: &[Event],
        control: &mut Control,
    ) -> Result<(), ObserverError>;
}

impl<T: ClockObserver + ?Sized> ClockObserver for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn observe(
        &mut self,
        state: &ClockState,
        events: &[Event],
        control: &mut Control,
    ) -> Result<(), ObserverError> {
        (**self).observe(state, events, control)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Total budget ran out.
    Completed,
    /// Stopped by an observer or because the time source closed.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub cycles_completed: u64,
    pub final_phase: PhaseKind,
    pub elapsed_ms: u64,
    pub frames: u64,
    pub observer_failures: u64,
}

/// Stops the clock when dropped, so the subscription never outlives `run`.
struct SubscriptionGuard<'c> {
    clock: &'c mut BreathingClock,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.clock.stop();
    }
}

/// Runs one session at a time against a set of observers.
#[derive(Default)]
pub struct SessionDriver<'a> {
    observers: Vec<Box<dyn ClockObserver + 'a>>,
}

impl<'a> SessionDriver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: impl ClockObserver + 'a) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn ClockObserver + 'a>) {
        self.observers.push(observer);
    }

    /// Start `clock` with `config` and drive it until it completes, an
    /// observer stops it, or `source` closes.
    pub fn run(
        &mut self,
        clock: &mut BreathingClock,
        config: SessionConfig,
        mut source: impl TimeSource,
    ) -> SessionSummary {
        let mut failures = 0u64;
        let mut frames = 0u64;

        let started = clock.start(config);
        let mut guard = SubscriptionGuard { clock };
        let mut stop_requested =
            self.publish(&guard.clock.state(), &[started], &mut failures);

        while !stop_requested && guard.clock.is_subscribed() {
            let Some(timestamp) = source.next_frame() else {
                tracing::debug!(frames, "time source closed before session end");
                break;
            };
            frames += 1;
            let events = guard.clock.on_frame(timestamp);
            stop_requested = self.publish(&guard.clock.state(), &events, &mut failures);
        }

        if let Some(stopped) = guard.clock.stop() {
            self.publish(&guard.clock.state(), &[stopped], &mut failures);
        }

        let state = guard.clock.state();
        let outcome = if guard.clock.is_finished() {
            SessionOutcome::Completed
        } else {
            SessionOutcome::Stopped
        };
        tracing::info!(
            ?outcome,
            cycles_completed = state.cycles_completed,
            frames,
            observer_failures = failures,
            "breathing session ended"
        );
        SessionSummary {
            outcome,
            cycles_completed: state.cycles_completed,
            final_phase: state.phase,
            elapsed_ms: config.total().saturating_sub(state.total_remaining).as_millis() as u64,
            frames,
            observer_failures: failures,
        }
    }

    /// Hand the snapshot to every observer. Returns whether any asked to stop.
    fn publish(&mut self, state: &ClockState, events: &[Event], failures: &mut u64) -> bool {
        let mut control = Control::default();
        for observer in self.observers.iter_mut() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                observer.observe(state, events, &mut control)
            }));
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => ObserverError::Panicked {
                    name: observer.name().to_string(),
                    message: panic_message(payload.as_ref()),
                },
            };
            *failures += 1;
            tracing::warn!(observer = observer.name(), error = %error, "observer failed, tick continues");
        }
        control.stop_requested()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedSource;
    use std::time::Duration;

    /// Records every snapshot it sees.
    #[derive(Default)]
    struct Recorder {
        states: Vec<ClockState>,
        events: Vec<Event>,
    }

    impl ClockObserver for Recorder {
        fn observe(
            &mut self,
            state: &ClockState,
            events: &[Event],
            _control: &mut Control,
        ) -> Result<(), ObserverError> {
            self.states.push(*state);
            self.events.extend_from_slice(events);
            Ok(())
        }
    }

    struct Failing;

    impl ClockObserver for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn observe(&mut self, _: &ClockState, _: &[Event], _: &mut Control) -> Result<(), ObserverError> {
            Err(ObserverError::Cue("speaker unplugged".into()))
        }
    }

    struct Panicking;

    impl ClockObserver for Panicking {
        fn observe(&mut self, _: &ClockState, _: &[Event], _: &mut Control) -> Result<(), ObserverError> {
            panic!("boom");
        }
    }

    /// Stops the session as soon as it sees `phase`.
    struct StopAt(PhaseKind);

    impl ClockObserver for StopAt {
        fn observe(&mut self, state: &ClockState, _: &[Event], control: &mut Control) -> Result<(), ObserverError> {
            if state.phase == self.0 {
                control.stop();
            }
            Ok(())
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn config() -> SessionConfig {
        SessionConfig::new(1_000, 1_000, 1_000, 8_000).unwrap()
    }

    #[test]
    fn runs_to_completion() {
        let mut clock = BreathingClock::new();
        let mut recorder = Recorder::default();
        let source = ScriptedSource::from_deltas(vec![ms(500); 16]);
        let summary = SessionDriver::new()
            .with_observer(&mut recorder)
            .run(&mut clock, config(), source);

        assert_eq!(summary.outcome, SessionOutcome::Completed);
        assert_eq!(summary.cycles_completed, 2);
        assert_eq!(summary.elapsed_ms, 8_000);
        assert_eq!(summary.frames, 17);
        assert!(!clock.is_subscribed());
        // Start + one per frame.
        assert_eq!(recorder.states.len(), 18);
        assert!(matches!(recorder.events.first(), Some(Event::SessionStarted { .. })));
        assert!(matches!(recorder.events.last(), Some(Event::SessionCompleted { .. })));
    }

    #[test]
    fn source_closing_stops_session() {
        let mut clock = BreathingClock::new();
        let mut recorder = Recorder::default();
        let source = ScriptedSource::from_deltas([ms(1_500)]);
        let summary = SessionDriver::new()
            .with_observer(&mut recorder)
            .run(&mut clock, config(), source);

        assert_eq!(summary.outcome, SessionOutcome::Stopped);
        assert_eq!(summary.elapsed_ms, 1_500);
        assert!(!clock.is_running());
        assert!(!clock.is_subscribed());
        assert!(matches!(recorder.events.last(), Some(Event::SessionStopped { .. })));
    }

    #[test]
    fn elapsed_floors_sub_millisecond_remainder() {
        let mut clock = BreathingClock::new();
        let config = SessionConfig::new(20_000, 1_000, 1_000, 10_000).unwrap();
        let source = ScriptedSource::from_timestamps([0.0, 9_999.6]);
        let summary = SessionDriver::new().run(&mut clock, config, source);

        assert_eq!(summary.outcome, SessionOutcome::Stopped);
        assert_eq!(clock.state().total_remaining, Duration::from_micros(400));
        assert_eq!(summary.elapsed_ms, 9_999);
    }

    #[test]
    fn observer_failures_do_not_interrupt_ticks() {
        let mut clock = BreathingClock::new();
        let mut recorder = Recorder::default();
        let source = ScriptedSource::from_deltas(vec![ms(1_000); 8]);
        let summary = SessionDriver::new()
            .with_observer(Failing)
            .with_observer(Panicking)
            .with_observer(&mut recorder)
            .run(&mut clock, config(), source);

        assert_eq!(summary.outcome, SessionOutcome::Completed);
        assert_eq!(summary.cycles_completed, 2);
        // start + 9 frames, two failing observers each time.
        assert_eq!(summary.observer_failures, 20);
        assert_eq!(recorder.states.len(), 10);
    }

    #[test]
    fn observer_can_stop_from_reaction() {
        let mut clock = BreathingClock::new();
        let mut recorder = Recorder::default();
        let source = ScriptedSource::from_deltas(vec![ms(1_000); 8]);
        let summary = SessionDriver::new()
            .with_observer(StopAt(PhaseKind::Exhale))
            .with_observer(&mut recorder)
            .run(&mut clock, config(), source);

        assert_eq!(summary.outcome, SessionOutcome::Stopped);
        assert_eq!(summary.final_phase, PhaseKind::Exhale);
        // Opening frame, then two 1s ticks reach Exhale; nothing after that.
        assert_eq!(summary.frames, 3);
        let last = recorder.states.last().unwrap();
        assert!(!last.running);
        assert_eq!(last.total_remaining, ms(6_000));
    }

    #[test]
    fn subscription_released_when_source_panics() {
        struct Exploding;
        impl TimeSource for Exploding {
            fn next_frame(&mut self) -> Option<f64> {
                panic!("display lost");
            }
        }

        let mut clock = BreathingClock::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            SessionDriver::new().run(&mut clock, config(), Exploding)
        }));
        assert!(result.is_err());
        assert!(!clock.is_subscribed());
        assert!(!clock.is_running());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
