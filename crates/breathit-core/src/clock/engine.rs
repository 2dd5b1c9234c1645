//! Breathing clock implementation.
//!
//! The clock is a delta-driven state machine. It owns no thread and never
//! reads the wall clock itself: the caller feeds it either elapsed deltas
//! (`on_tick`) or frame timestamps (`on_frame`) on whatever cadence the
//! display delivers.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Completed | Stopped)
//!            ^                 |
//!            +---- start() ----+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut clock = BreathingClock::new();
//! clock.start(SessionConfig::default());
//! // Once per frame:
//! let events = clock.on_tick(Duration::from_micros(16_700));
//! ```

use std::time::Duration;

use chrono::Utc;

use super::phase::{AdvancePolicy, PhaseKind, SessionConfig};
use crate::events::Event;

/// Read-only snapshot of the clock.
///
/// Handed out by value; mutation only happens inside [`BreathingClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub phase: PhaseKind,
    pub running: bool,
    pub phase_remaining: Duration,
    pub total_remaining: Duration,
    pub cycles_completed: u64,
    /// Configured length of `phase` (zero before the first start).
    pub phase_duration: Duration,
}

impl ClockState {
    fn zeroed() -> Self {
        Self {
            phase: PhaseKind::Inhale,
            running: false,
            phase_remaining: Duration::ZERO,
            total_remaining: Duration::ZERO,
            cycles_completed: 0,
            phase_duration: Duration::ZERO,
        }
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        if self.phase_duration.is_zero() {
            return 0.0;
        }
        let progress =
            1.0 - self.phase_remaining.as_secs_f64() / self.phase_duration.as_secs_f64();
        progress.clamp(0.0, 1.0)
    }

    pub fn phase_remaining_ms(&self) -> u64 {
        self.phase_remaining.as_millis() as u64
    }

    pub fn total_remaining_ms(&self) -> u64 {
        self.total_remaining.as_millis() as u64
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Live tick subscription. Exists from `start()` until stop or completion.
#[derive(Debug, Default)]
struct Subscription {
    last_frame_ms: Option<f64>,
}

impl Subscription {
    /// Delta since the previous frame; the first frame counts as zero and
    /// backwards or non-finite timestamps clamp to zero.
    fn delta(&mut self, timestamp_ms: f64) -> Duration {
        let previous = self.last_frame_ms.replace(timestamp_ms).unwrap_or(timestamp_ms);
        let delta_ms = timestamp_ms - previous;
        if !delta_ms.is_finite() || delta_ms <= 0.0 {
            return Duration::ZERO;
        }
        // `as` saturates, so absurdly large gaps clamp instead of wrapping.
        Duration::from_nanos((delta_ms * 1_000_000.0).round() as u64)
    }
}

/// Phase-sequencing clock for a guided breathing session.
#[derive(Debug, Default)]
pub struct BreathingClock {
    config: Option<SessionConfig>,
    state: ClockState,
    subscription: Option<Subscription>,
}

impl BreathingClock {
    /// Create an idle clock with a zeroed state.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Whether the clock still wants frames from its time source.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Session ran its whole budget (as opposed to never started or stopped early).
    pub fn is_finished(&self) -> bool {
        self.config.is_some() && !self.state.running && self.state.total_remaining.is_zero()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            running: self.state.running,
            phase_remaining_ms: self.state.phase_remaining_ms(),
            total_remaining_ms: self.state.total_remaining_ms(),
            phase_progress: self.state.phase_progress(),
            cycles_completed: self.state.cycles_completed,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session. A running session is discarded and replaced.
    pub fn start(&mut self, config: SessionConfig) -> Event {
        if self.state.running {
            tracing::debug!(
                cycles_completed = self.state.cycles_completed,
                "restarting clock, previous session discarded"
            );
        }
        let inhale = config.duration_of(PhaseKind::Inhale);
        self.config = Some(config);
        self.state = ClockState {
            phase: PhaseKind::Inhale,
            running: true,
            phase_remaining: inhale,
            total_remaining: config.total(),
            cycles_completed: 0,
            phase_duration: inhale,
        };
        self.subscription = Some(Subscription::default());
        tracing::debug!(
            inhale_ms = config.inhale_ms,
            hold_ms = config.hold_ms,
            exhale_ms = config.exhale_ms,
            total_ms = config.total_ms,
            "breathing session started"
        );
        Event::SessionStarted {
            config,
            at: Utc::now(),
        }
    }

    /// Stop the session. Returns `None` when there was nothing to stop.
    pub fn stop(&mut self) -> Option<Event> {
        if !self.state.running && self.subscription.is_none() {
            return None;
        }
        self.state.running = false;
        self.subscription = None;
        tracing::debug!(
            cycles_completed = self.state.cycles_completed,
            "breathing session stopped"
        );
        Some(Event::SessionStopped {
            cycles_completed: self.state.cycles_completed,
            total_remaining_ms: self.state.total_remaining_ms(),
            at: Utc::now(),
        })
    }

    /// Feed a frame timestamp (ms, monotonic). Converts to a delta against
    /// the previous frame and applies it with [`Self::on_tick`].
    pub fn on_frame(&mut self, timestamp_ms: f64) -> Vec<Event> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Vec::new();
        };
        let elapsed = subscription.delta(timestamp_ms);
        self.on_tick(elapsed)
    }

    /// Apply `elapsed` time since the previous tick.
    ///
    /// Phase advancement is evaluated before total-budget expiry, so the
    /// final boundary is reported even when both run out on the same tick.
    pub fn on_tick(&mut self, elapsed: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(config) = self.config else {
            return events;
        };
        if !self.state.running {
            return events;
        }

        let budget = self.state.total_remaining;
        match config.advance {
            AdvancePolicy::SinglePhase => {
                self.state.phase_remaining = self.state.phase_remaining.saturating_sub(elapsed);
                self.state.total_remaining = budget.saturating_sub(elapsed);
                if self.state.phase_remaining.is_zero() {
                    self.advance(&config, &mut events);
                }
            }
            AdvancePolicy::CatchUp => {
                self.state.total_remaining = budget.saturating_sub(elapsed);
                let mut left = elapsed.min(budget);
                loop {
                    if left < self.state.phase_remaining {
                        self.state.phase_remaining -= left;
                        break;
                    }
                    left -= self.state.phase_remaining;
                    self.state.phase_remaining = Duration::ZERO;
                    self.advance(&config, &mut events);
                    // Zero-length phases (hand-built config) would never consume `left`.
                    if left.is_zero() || self.state.phase_remaining.is_zero() {
                        break;
                    }
                }
            }
        }

        if self.state.total_remaining.is_zero() {
            self.state.running = false;
            self.subscription = None;
            tracing::debug!(
                cycles_completed = self.state.cycles_completed,
                "breathing session completed"
            );
            events.push(Event::SessionCompleted {
                cycles_completed: self.state.cycles_completed,
                total_ms: config.total_ms,
                at: Utc::now(),
            });
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn advance(&mut self, config: &SessionConfig, events: &mut Vec<Event>) {
        let from = self.state.phase;
        let to = from.next();
        if from == PhaseKind::Exhale {
            self.state.cycles_completed += 1;
            events.push(Event::CycleCompleted {
                cycles_completed: self.state.cycles_completed,
                at: Utc::now(),
            });
        }
        let duration = config.duration_of(to);
        self.state.phase = to;
        self.state.phase_duration = duration;
        self.state.phase_remaining = duration;
        tracing::trace!(?from, ?to, "phase advanced");
        events.push(Event::PhaseChanged {
            from,
            to,
            cycles_completed: self.state.cycles_completed,
            at: Utc::now(),
        });
    }
}
