//! Time sources that drive the breathing clock.
//!
//! A source hands out monotonic frame timestamps (milliseconds) on its
//! own cadence. The clock only ever looks at the difference between two
//! consecutive frames, so sources are free to start at any origin.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default display cadence.
pub const DEFAULT_FPS: u32 = 60;
/// Frame rate bounds shared by every source.
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 240;

/// Port for frame delivery.
pub trait TimeSource {
    /// Wait for the next frame and return its timestamp in milliseconds.
    ///
    /// `None` means the source is closed and no more frames will come.
    fn next_frame(&mut self) -> Option<f64>;
}

impl<T: TimeSource + ?Sized> TimeSource for &mut T {
    fn next_frame(&mut self) -> Option<f64> {
        (**self).next_frame()
    }
}

/// Real-time source that paces frames with `thread::sleep`.
///
/// When a frame is late the schedule restarts from "now" instead of
/// firing a burst of catch-up frames.
#[derive(Debug)]
pub struct IntervalSource {
    origin: Instant,
    frame: Duration,
    next_deadline: Instant,
    interrupt: Option<Arc<AtomicBool>>,
}

impl IntervalSource {
    pub fn new(fps: u32) -> Self {
        let fps = fps.clamp(MIN_FPS, MAX_FPS);
        let now = Instant::now();
        Self {
            origin: now,
            frame: Duration::from_secs(1) / fps,
            next_deadline: now,
            interrupt: None,
        }
    }

    /// Close the source once `flag` becomes true.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl Default for IntervalSource {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl TimeSource for IntervalSource {
    fn next_frame(&mut self) -> Option<f64> {
        if self.interrupted() {
            return None;
        }
        let now = Instant::now();
        if self.next_deadline > now {
            thread::sleep(self.next_deadline - now);
        }
        if self.interrupted() {
            return None;
        }
        let now = Instant::now();
        self.next_deadline = (self.next_deadline + self.frame).max(now);
        Some(now.duration_since(self.origin).as_secs_f64() * 1000.0)
    }
}

/// Replays a fixed list of frame timestamps without waiting.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    frames: VecDeque<f64>,
}

impl ScriptedSource {
    pub fn from_timestamps(frames: impl IntoIterator<Item = f64>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// One zero-delta opening frame followed by one frame per delta.
    pub fn from_deltas(deltas: impl IntoIterator<Item = Duration>) -> Self {
        let mut now = 0.0;
        let mut frames = VecDeque::from([now]);
        for delta in deltas {
            now += delta.as_nanos() as f64 / 1_000_000.0;
            frames.push_back(now);
        }
        Self { frames }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl TimeSource for ScriptedSource {
    fn next_frame(&mut self) -> Option<f64> {
        self.frames.pop_front()
    }
}

/// Fixed-rate virtual frames up to a time limit; never sleeps.
#[derive(Debug, Clone)]
pub struct VirtualFrameSource {
    frame_ms: f64,
    last_index: u64,
    index: u64,
}

impl VirtualFrameSource {
    /// Frames at `fps` (clamped to `MIN_FPS..=MAX_FPS`) covering at least `limit`.
    pub fn new(fps: f64, limit: Duration) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps.clamp(f64::from(MIN_FPS), f64::from(MAX_FPS))
        } else {
            f64::from(DEFAULT_FPS)
        };
        let frame_ms = 1000.0 / fps;
        let limit_ms = limit.as_secs_f64() * 1000.0;
        Self {
            frame_ms,
            // One frame past the limit so the final partial frame is delivered.
            last_index: (limit_ms / frame_ms).ceil() as u64 + 1,
            index: 0,
        }
    }

    pub fn frame_ms(&self) -> f64 {
        self.frame_ms
    }
}

impl TimeSource for VirtualFrameSource {
    fn next_frame(&mut self) -> Option<f64> {
        if self.index > self.last_index {
            return None;
        }
        let now = self.index as f64 * self.frame_ms;
        self.index += 1;
        Some(now)
    }
}
