use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use breathit_core::format::format_clock;
use breathit_core::{
    AdvancePolicy, BreathingClock, ClockObserver, ClockState, CompletionRecorder, Config,
    Control, Cue, CueSink, Database, Event, HoldCue, IntervalSource, ObserverError,
    SessionDriver, SessionSummary, VirtualFrameSource,
};
use clap::{Args, Subcommand};

use super::config::describe_session;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a live session in the terminal (Ctrl-C stops without saving)
    Run {
        #[command(flatten)]
        practice: PracticeArgs,
        /// Print events and the summary as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Run a session against virtual frames and print its summary
    Simulate {
        #[command(flatten)]
        practice: PracticeArgs,
        /// Virtual frame rate (clamped to 1-240)
        #[arg(long, default_value_t = 60.0)]
        fps: f64,
        /// Also print every event as a JSON line
        #[arg(long)]
        events: bool,
    },
}

/// Per-run overrides of the `[practice]` config section.
#[derive(Args, Debug, Default)]
pub struct PracticeArgs {
    /// Session length in minutes (1-120)
    #[arg(long)]
    pub minutes: Option<u32>,
    /// Inhale seconds (1-60)
    #[arg(long)]
    pub inhale: Option<u32>,
    /// Hold seconds, used for both holds (1-60)
    #[arg(long)]
    pub hold: Option<u32>,
    /// Exhale seconds (1-60)
    #[arg(long)]
    pub exhale: Option<u32>,
    /// Let one long frame advance through several phases
    #[arg(long)]
    pub catch_up: bool,
}

impl PracticeArgs {
    fn apply(&self, config: &mut Config) {
        let practice = &mut config.practice;
        if let Some(minutes) = self.minutes {
            practice.minutes = minutes;
        }
        if let Some(secs) = self.inhale {
            practice.inhale_secs = secs;
        }
        if let Some(secs) = self.hold {
            practice.hold_secs = secs;
        }
        if let Some(secs) = self.exhale {
            practice.exhale_secs = secs;
        }
        if self.catch_up {
            practice.advance = AdvancePolicy::CatchUp;
        }
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run { practice, json } => run_live(&practice, json),
        SessionAction::Simulate {
            practice,
            fps,
            events,
        } => simulate(&practice, fps, events),
    }
}

fn run_live(practice: &PracticeArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();
    practice.apply(&mut config);
    let session = config.session_config()?;
    let cues = config.cues.clone();
    let fps = config.display.fps;

    let interrupt = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let summary = runtime.block_on(async {
        let flag = interrupt.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            // History is best effort; a missing database never blocks practice.
            let db = match Database::open() {
                Ok(db) => Some(db),
                Err(e) => {
                    tracing::warn!(error = %e, "history unavailable, session will not be saved");
                    None
                }
            };

            let mut driver = SessionDriver::new().with_observer(TerminalView::new(json));
            if cues.enabled {
                let bell = TerminalBell {
                    sound: cues.sound.clone(),
                };
                let threshold = Duration::from_millis(cues.hold_threshold_ms);
                driver.add_observer(Box::new(HoldCue::with_threshold(bell, threshold)));
            }
            if let Some(db) = &db {
                driver.add_observer(Box::new(CompletionRecorder::new(db)));
            }

            let mut clock = BreathingClock::new();
            let source = IntervalSource::new(fps).with_interrupt(flag);
            driver.run(&mut clock, session, source)
        });

        tokio::select! {
            joined = &mut task => joined,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, stopping session");
                interrupt.store(true, Ordering::Relaxed);
                task.await
            }
        }
    })?;

    print_summary(&summary, json)
}

fn simulate(
    practice: &PracticeArgs,
    fps: f64,
    events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();
    practice.apply(&mut config);
    let session = config.session_config()?;

    let mut driver = SessionDriver::new();
    if events {
        driver.add_observer(Box::new(EventLines));
    }
    let mut clock = BreathingClock::new();
    let summary = driver.run(&mut clock, session, VirtualFrameSource::new(fps, session.total()));
    print_summary(&summary, true)
}

fn print_summary(summary: &SessionSummary, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        println!(
            "Session {:?}: {} cycles in {}",
            summary.outcome,
            summary.cycles_completed,
            format_clock(Duration::from_millis(summary.elapsed_ms))
        );
        if summary.observer_failures > 0 {
            println!("  ({} observer failures, see logs)", summary.observer_failures);
        }
    }
    Ok(())
}

/// Prints one line per phase change, or every event as JSON.
struct TerminalView {
    json: bool,
}

impl TerminalView {
    fn new(json: bool) -> Self {
        Self { json }
    }
}

impl ClockObserver for TerminalView {
    fn name(&self) -> &str {
        "terminal"
    }

    fn observe(
        &mut self,
        state: &ClockState,
        events: &[Event],
        _control: &mut Control,
    ) -> Result<(), ObserverError> {
        let mut out = std::io::stdout().lock();
        if self.json {
            return write_event_lines(&mut out, events);
        }
        let mut new_phase = false;
        for event in events {
            match event {
                Event::SessionStarted { config, .. } => {
                    writeln!(out, "Breathing {} (Ctrl-C to stop)", describe_session(config))?;
                    new_phase = true;
                }
                Event::PhaseChanged { .. } => new_phase = true,
                Event::SessionCompleted { cycles_completed, .. } => {
                    writeln!(out, "Done. {cycles_completed} cycles.")?;
                }
                Event::SessionStopped { .. } => writeln!(out, "Stopped, not saved.")?,
                _ => {}
            }
        }
        if new_phase && state.running {
            print_phase(&mut out, state)?;
        }
        Ok(())
    }
}

fn print_phase(out: &mut impl Write, state: &ClockState) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<12} {}  left {}  cycles {}",
        state.phase.label(),
        format_clock(state.phase_remaining),
        format_clock(state.total_remaining),
        state.cycles_completed
    )
}

/// Event stream for `simulate --events`.
struct EventLines;

impl ClockObserver for EventLines {
    fn name(&self) -> &str {
        "event-lines"
    }

    fn observe(&mut self, _: &ClockState, events: &[Event], _: &mut Control) -> Result<(), ObserverError> {
        write_event_lines(&mut std::io::stdout().lock(), events)
    }
}

fn write_event_lines(out: &mut impl Write, events: &[Event]) -> Result<(), ObserverError> {
    for event in events {
        let line = serde_json::to_string(event).map_err(std::io::Error::from)?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Rings the terminal bell on stderr.
struct TerminalBell {
    sound: Option<String>,
}

impl CueSink for TerminalBell {
    fn play(&mut self, cue: Cue) -> Result<(), ObserverError> {
        tracing::debug!(?cue, sound = ?self.sound, "cue");
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_practice_values() {
        let mut config = Config::default();
        let args = PracticeArgs {
            minutes: Some(10),
            hold: Some(7),
            catch_up: true,
            ..PracticeArgs::default()
        };
        args.apply(&mut config);
        assert_eq!(config.practice.minutes, 10);
        assert_eq!(config.practice.hold_secs, 7);
        assert_eq!(config.practice.inhale_secs, 4);
        assert_eq!(config.practice.advance, AdvancePolicy::CatchUp);
    }

    #[test]
    fn out_of_range_overrides_are_clamped() {
        let mut config = Config::default();
        let args = PracticeArgs {
            minutes: Some(500),
            inhale: Some(0),
            ..PracticeArgs::default()
        };
        args.apply(&mut config);
        let session = config.session_config().unwrap();
        assert_eq!(session.total_ms, 120 * 60 * 1000);
        assert_eq!(session.inhale_ms, 1000);
    }

    #[test]
    fn event_lines_are_json() {
        let mut buf = Vec::new();
        let clock = BreathingClock::new();
        write_event_lines(&mut buf, &[clock.snapshot()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["type"], "state_snapshot");
    }

    #[test]
    fn phase_line_shows_label_and_clocks() {
        let state = ClockState {
            phase: breathit_core::PhaseKind::Hold1,
            running: true,
            phase_remaining: Duration::from_millis(2_100),
            total_remaining: Duration::from_secs(90),
            cycles_completed: 3,
            phase_duration: Duration::from_secs(4),
        };
        let mut buf = Vec::new();
        print_phase(&mut buf, &state).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert!(line.starts_with("Keep breath"));
        assert!(line.contains("00:03"));
        assert!(line.contains("01:30"));
        assert!(line.contains("cycles 3"));
    }
}
