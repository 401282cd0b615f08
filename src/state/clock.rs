//! Game and shot clock measured against a monotonic instant.
//!
//! Every operation takes `now` explicitly so callers read the time once per
//! request and tests can drive the clock without sleeping.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::engine::ClockPosition;

/// Errors raised by clock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The clock is already running.
    #[error("game clock is already running")]
    AlreadyRunning,
    /// The clock must be running for this operation.
    #[error("game clock is not running")]
    NotRunning,
    /// The operation needs a stopped clock.
    #[error("game clock must be stopped")]
    Running,
    /// No time left in the period.
    #[error("no time left in period {period}")]
    Expired {
        /// Period whose clock ran out.
        period: u8,
    },
    /// Requested time exceeds the period length.
    #[error("{requested_ms} ms exceeds the period length of {max_ms} ms")]
    ExceedsPeriod {
        /// Value requested by the scorer.
        requested_ms: u32,
        /// Length of the current period.
        max_ms: u32,
    },
    /// The rule set has no shot clock.
    #[error("this game is played without a shot clock")]
    NoShotClock,
}

/// Game clock of the current period with an optional shot clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameClock {
    period: u8,
    period_length_ms: u32,
    remaining_ms: u32,
    shot_clock_ms: Option<u32>,
    running_since: Option<Instant>,
}

impl GameClock {
    /// Clock for the first period, stopped at full time.
    pub fn new(period_length_ms: u32, shot_clock_ms: Option<u32>) -> Self {
        Self::restore(1, period_length_ms, period_length_ms, shot_clock_ms)
    }

    /// Stopped clock rebuilt from a stored reading.
    pub fn restore(
        period: u8,
        period_length_ms: u32,
        remaining_ms: u32,
        shot_clock_ms: Option<u32>,
    ) -> Self {
        Self {
            period,
            period_length_ms,
            remaining_ms: remaining_ms.min(period_length_ms),
            shot_clock_ms,
            running_since: None,
        }
    }

    pub fn period(&self) -> u8 {
        self.period
    }

    pub fn period_length_ms(&self) -> u32 {
        self.period_length_ms
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Game time left in the period, saturating at zero.
    pub fn remaining_ms(&self, now: Instant) -> u32 {
        self.remaining_ms.saturating_sub(self.elapsed_ms(now))
    }

    /// Shot clock reading, `None` when the game has no shot clock.
    pub fn shot_clock_ms(&self, now: Instant) -> Option<u32> {
        let elapsed = self.elapsed_ms(now);
        self.shot_clock_ms.map(|shot| shot.saturating_sub(elapsed))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining_ms(now) == 0
    }

    pub fn is_shot_clock_expired(&self, now: Instant) -> bool {
        self.shot_clock_ms(now) == Some(0)
    }

    /// Period and game time to stamp on a stat event.
    pub fn position(&self, now: Instant) -> ClockPosition {
        ClockPosition {
            period: self.period,
            remaining_ms: self.remaining_ms(now),
        }
    }

    pub fn start(&mut self, now: Instant) -> Result<(), ClockError> {
        if self.is_running() {
            return Err(ClockError::AlreadyRunning);
        }
        if self.remaining_ms == 0 {
            return Err(ClockError::Expired {
                period: self.period,
            });
        }

        self.running_since = Some(now);
        Ok(())
    }

    /// Stop the clock and return the game time left.
    pub fn stop(&mut self, now: Instant) -> Result<u32, ClockError> {
        if !self.is_running() {
            return Err(ClockError::NotRunning);
        }

        self.fold(now);
        self.running_since = None;
        Ok(self.remaining_ms)
    }

    /// Correct the game time. Only allowed while stopped.
    pub fn set(&mut self, remaining_ms: u32) -> Result<(), ClockError> {
        if self.is_running() {
            return Err(ClockError::Running);
        }
        if remaining_ms > self.period_length_ms {
            return Err(ClockError::ExceedsPeriod {
                requested_ms: remaining_ms,
                max_ms: self.period_length_ms,
            });
        }

        self.remaining_ms = remaining_ms;
        Ok(())
    }

    /// Reset the shot clock to `shot_clock_ms`, running or not.
    pub fn reset_shot_clock(&mut self, shot_clock_ms: u32, now: Instant) -> Result<(), ClockError> {
        if self.shot_clock_ms.is_none() {
            return Err(ClockError::NoShotClock);
        }

        self.fold(now);
        self.shot_clock_ms = Some(shot_clock_ms);
        Ok(())
    }

    /// Move to `period` with a full, stopped clock.
    pub fn begin_period(
        &mut self,
        period: u8,
        period_length_ms: u32,
        shot_clock_ms: Option<u32>,
    ) -> Result<(), ClockError> {
        if self.is_running() {
            return Err(ClockError::Running);
        }

        *self = Self::restore(period, period_length_ms, period_length_ms, shot_clock_ms);
        Ok(())
    }

    fn elapsed_ms(&self, now: Instant) -> u32 {
        self.running_since
            .map(|since| millis(now.saturating_duration_since(since)))
            .unwrap_or(0)
    }

    /// Move elapsed running time into the stored readings.
    fn fold(&mut self, now: Instant) {
        if self.running_since.is_none() {
            return;
        }

        let elapsed = self.elapsed_ms(now);
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
        self.shot_clock_ms = self.shot_clock_ms.map(|shot| shot.saturating_sub(elapsed));
        self.running_since = Some(now);
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
