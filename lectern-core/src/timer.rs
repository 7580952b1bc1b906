//! Elapsed-seconds counter
//!
//! The timer does not own a clock. Whoever drives the session delivers a
//! tick once per interval; the timer only counts ticks while running.

use tracing::trace;

/// Elapsed recording time in whole seconds
#[derive(Debug, Clone, Default)]
pub struct Timer {
    elapsed: u64,
    running: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin counting ticks
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop counting; the value is kept
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Stop and zero
    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed = 0;
    }

    /// Count one interval. Returns the new value if it advanced.
    pub fn tick(&mut self) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.elapsed = self.elapsed.saturating_add(1);
        trace!("Timer tick: {}s", self.elapsed);
        Some(self.elapsed)
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Format seconds as `MM:SS`, or `H:MM:SS` past an hour
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
