//! Broadcast rate limiter
//!
//! A sliding-window admission controller in front of the broadcaster. At
//! most [`MAX_HITS_PER_WINDOW`] + 1 batches are admitted per
//! [`WINDOW`]; each rejection counts as a violation, and once the
//! violation total passes [`TRIP_THRESHOLD`] the limiter latches into the
//! terminal `Tripped` state, after which the owning pipeline must tear
//! itself down. A tripped limiter never recovers; restarting monitoring
//! constructs a fresh one.
//!
//! The limiter is driven by exactly one pipeline task, so plain mutable
//! state suffices; the per-batch read-modify-write in [`RateLimiter::observe`]
//! is serialized by that ownership. The current time is passed in by the
//! caller to keep the window arithmetic testable.

use std::time::{Duration, Instant};

/// Admission window length
pub const WINDOW: Duration = Duration::from_secs(5);

/// Highest in-window hit count that is still admitted. Counting starts at
/// zero, so this admits 3 batches per window.
pub const MAX_HITS_PER_WINDOW: u32 = 2;

/// Violation count beyond which the limiter trips
pub const TRIP_THRESHOLD: u32 = 10;

/// Limiter states
///
/// ```text
/// Idle ──► Admitting ──► Warning ──► Tripped (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterState {
    /// No batch observed yet
    Idle,
    /// Batches flowing, no violation recorded
    Admitting,
    /// At least one violation recorded, still below the trip threshold
    Warning,
    /// Violation total exceeded the threshold; permanently latched
    Tripped,
}

/// Outcome of observing one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the batch to the broadcaster
    Admitted,
    /// Reject the batch; a violation was recorded
    Rejected,
    /// This observation crossed the trip threshold: tear the pipeline down
    Tripped,
    /// The limiter tripped earlier; nothing is admitted any more
    AlreadyTripped,
}

/// Sliding-window admission state for one pipeline instance
#[derive(Debug)]
pub struct RateLimiter {
    /// Start of the current window; `None` until the first observation
    /// (and treated as an elapsed window, so the first batch opens one)
    window_start: Option<Instant>,
    hits_in_window: u32,
    total_violations: u32,
    state: LimiterState,
}

impl RateLimiter {
    /// Create a limiter in the `Idle` state
    pub fn new() -> Self {
        Self {
            window_start: None,
            hits_in_window: 0,
            total_violations: 0,
            state: LimiterState::Idle,
        }
    }

    /// Observe one non-empty batch at time `now` and decide its fate.
    ///
    /// Production callers pass `Instant::now()`.
    pub fn observe(&mut self, now: Instant) -> Verdict {
        if self.state == LimiterState::Tripped {
            return Verdict::AlreadyTripped;
        }

        match self.window_start {
            Some(start) if now.duration_since(start) <= WINDOW => {
                self.hits_in_window += 1;
            }
            _ => {
                // Window elapsed (or first batch): this batch is hit zero
                // of a fresh window
                self.hits_in_window = 0;
                self.window_start = Some(now);
            }
        }

        let verdict = if self.hits_in_window <= MAX_HITS_PER_WINDOW {
            if self.state == LimiterState::Idle {
                self.state = LimiterState::Admitting;
            }
            Verdict::Admitted
        } else {
            self.total_violations += 1;
            self.state = LimiterState::Warning;
            Verdict::Rejected
        };

        if self.total_violations > TRIP_THRESHOLD {
            self.state = LimiterState::Tripped;
            return Verdict::Tripped;
        }

        verdict
    }

    /// Current state
    pub fn state(&self) -> LimiterState {
        self.state
    }

    /// Violations recorded over the lifetime of this limiter
    pub fn total_violations(&self) -> u32 {
        self.total_violations
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "limiter_test.rs"]
mod tests;
