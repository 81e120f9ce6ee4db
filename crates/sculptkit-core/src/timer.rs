//! Single-owner debounce timer used to detect the end of a wheel burst.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// A timer with at most one pending deadline.
///
/// Arming while pending cancels the previous deadline (last write wins), so a
/// burst of arms fires exactly once, `window` after the last one.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and schedule a new one.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once when the deadline has passed, disarming the timer.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
