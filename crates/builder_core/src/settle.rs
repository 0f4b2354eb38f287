//! Decides when a burst of edits has settled enough to be recorded.

use std::time::{Duration, Instant};

pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(500);

pub trait SettlePolicy {
    fn note_edit(&mut self, now: Instant);

    /// True exactly once per burst, when the burst has settled.
    fn poll(&mut self, now: Instant) -> bool;

    fn reset(&mut self);

    fn is_pending(&self) -> bool;
}

/// Settles once `window` has passed since the last edit.
#[derive(Debug, Clone)]
pub struct SettleWindow {
    window: Duration,
    last_edit: Option<Instant>,
}

impl SettleWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_edit: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for SettleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_WINDOW)
    }
}

impl SettlePolicy for SettleWindow {
    fn note_edit(&mut self, now: Instant) {
        self.last_edit = Some(now);
    }

    fn poll(&mut self, now: Instant) -> bool {
        match self.last_edit {
            Some(last) if now.saturating_duration_since(last) >= self.window => {
                self.last_edit = None;
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.last_edit = None;
    }

    fn is_pending(&self) -> bool {
        self.last_edit.is_some()
    }
}

/// Every edit settles at the next poll.
#[derive(Debug, Clone, Default)]
pub struct Immediate {
    pending: bool,
}

impl SettlePolicy for Immediate {
    fn note_edit(&mut self, _now: Instant) {
        self.pending = true;
    }

    fn poll(&mut self, _now: Instant) -> bool {
        std::mem::take(&mut self.pending)
    }

    fn reset(&mut self) {
        self.pending = false;
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
#[path = "tests/settle_tests.rs"]
mod tests;
