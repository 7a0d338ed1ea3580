//! Simulation clock: the sole source of in-game time.
//!
//! The clock converts real elapsed time into discrete in-game days. Callers
//! feed it the time that passed since the previous call; once a full day
//! interval has accumulated, the day counter advances by exactly one.
//!
//! # Design Principles
//!
//! - At most one day per [`Clock::tick`], even after a long stall. Surplus
//!   time carries over, so a stalled driver catches up one day per call
//!   instead of skipping days.
//! - Pausing freezes the accumulator; the sub-interval remainder is kept
//!   for when the clock resumes.
//! - Checked and saturating arithmetic only.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Invalid clock configuration (e.g. a zero day interval).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Emitted when the clock crosses a day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAdvanced {
    /// The day that just began.
    pub day: u64,
}

/// Day counter driven by elapsed real time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Current day (0 before the first boundary).
    day: u64,
    /// Real time per in-game day.
    interval: Duration,
    /// Time accumulated toward the next boundary.
    accumulated: Duration,
    /// Whether advancement is suspended.
    paused: bool,
}

impl Clock {
    /// Create a clock at day 0 with the given day interval.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, ClockError> {
        if interval.is_zero() {
            return Err(ClockError::InvalidConfig {
                reason: "day interval must be greater than zero".to_owned(),
            });
        }
        Ok(Self {
            day: 0,
            interval,
            accumulated: Duration::ZERO,
            paused: false,
        })
    }

    /// Feed elapsed real time into the clock.
    ///
    /// Returns [`DayAdvanced`] when a boundary was crossed. While paused the
    /// call is a no-op and the accumulator is left untouched.
    pub fn tick(&mut self, elapsed: Duration) -> Option<DayAdvanced> {
        if self.paused {
            return None;
        }
        self.accumulated = self.accumulated.saturating_add(elapsed);
        if self.accumulated < self.interval {
            return None;
        }
        let day = self.day.checked_add(1)?;
        self.accumulated = self.accumulated.saturating_sub(self.interval);
        self.day = day;
        Some(DayAdvanced { day })
    }

    /// Advance one day regardless of accumulated time.
    ///
    /// Used by headless drivers and tests. Still a no-op while paused.
    pub fn force_advance(&mut self) -> Option<DayAdvanced> {
        if self.paused {
            return None;
        }
        let day = self.day.checked_add(1)?;
        self.day = day;
        Some(DayAdvanced { day })
    }

    /// Suspend advancement.
    pub const fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume advancement with the accumulator as it was.
    pub const fn resume(&mut self) {
        self.paused = false;
    }

    /// Current day.
    pub const fn day(&self) -> u64 {
        self.day
    }

    /// Whether the clock is paused.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Real time per in-game day.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Time accumulated toward the next boundary.
    pub const fn accumulated(&self) -> Duration {
        self.accumulated
    }
}
