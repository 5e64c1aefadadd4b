//! Redraw coalescing and debounce timers.
//!
//! The editor is single-threaded and frame driven. Redraw requests only set a
//! flag; the host runs one tick per scheduled frame and the tick clears the
//! flag before doing any work, so requests made during the tick schedule the
//! next frame.

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Coalesces redraw requests into at most one pending frame.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    scheduled: bool,
    frames: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the scene dirty. Returns `true` only when this call scheduled a
    /// new frame (the host should enqueue its frame callback then).
    pub fn request_redraw(&mut self) -> bool {
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Start a tick. Returns whether a frame was pending.
    pub fn begin_tick(&mut self) -> bool {
        let was_scheduled = std::mem::take(&mut self.scheduled);
        if was_scheduled {
            self.frames += 1;
        }
        was_scheduled
    }

    /// Number of ticks that ran a scheduled frame.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Trailing-edge debounce: each `schedule` replaces the pending value and
/// pushes the deadline out; `poll` yields the value once the deadline passes.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay_ms: f64,
    pending: Option<(f64, T)>,
}

impl<T> Debounce<T> {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    pub fn schedule(&mut self, value: T, now_ms: f64) {
        self.pending = Some((now_ms + self.delay_ms, value));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending value, if any.
    pub fn deadline(&self) -> Option<f64> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now_ms >= *deadline => self.cancel(),
            _ => None,
        }
    }
}

/// Monotonic milliseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    origin: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        Instant::now().duration_since(self.origin).as_secs_f64() * 1000.0
    }
}
