// File: ./src/window.rs
// The half-open time window an alarm must fall into to be sent this run.
use crate::error::WindowError;
use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// Fired before this run's window.
    Expired,
    /// Inside the window; a reminder goes out.
    Triggered,
    /// Fires after the window, a later run handles it.
    Pending,
}

/// `[start, end)`, with `start` on a whole minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReferenceWindow {
    /// Builds the window for a run started at `now`.
    pub fn new(now: DateTime<Utc>, minutes_ahead: i64) -> Result<Self, WindowError> {
        if minutes_ahead <= 0 {
            return Err(WindowError::NonPositive(minutes_ahead));
        }
        let length =
            Duration::try_minutes(minutes_ahead).ok_or(WindowError::OutOfRange(minutes_ahead))?;
        let start = now
            .duration_trunc(Duration::minutes(1))
            .map_err(|_| WindowError::OutOfRange(minutes_ahead))?;
        let end = start
            .checked_add_signed(length)
            .ok_or(WindowError::OutOfRange(minutes_ahead))?;
        Ok(Self { start, end })
    }

    pub fn classify<Tz: TimeZone>(&self, trigger: &DateTime<Tz>) -> AlarmState {
        let trigger = trigger.with_timezone(&Utc);
        if trigger < self.start {
            AlarmState::Expired
        } else if trigger < self.end {
            AlarmState::Triggered
        } else {
            AlarmState::Pending
        }
    }
}
