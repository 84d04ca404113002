//! Timeout durations — how long a light may stay ON before it is switched off.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest delay the system will ever schedule, in seconds (24 hours).
pub const MAX_SCHEDULE_DELAY_SECS: u32 = 86_400;

/// Default auto-off timeout applied to new owners.
pub const DEFAULT_TIMEOUT_SECS: u32 = 600;

/// A validated auto-off timeout in whole seconds, within `1..=86400`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeoutDuration(u32);

impl TimeoutDuration {
    /// Build a timeout from a total number of seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroTimeout`] for zero and
    /// [`ValidationError::TimeoutTooLong`] above 24 hours.
    pub fn from_secs(secs: u32) -> Result<Self, ValidationError> {
        if secs == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if secs > MAX_SCHEDULE_DELAY_SECS {
            return Err(ValidationError::TimeoutTooLong(u64::from(secs)));
        }
        Ok(Self(secs))
    }

    /// Build a timeout from clock-style components.
    ///
    /// # Errors
    ///
    /// Each component is range-checked (`hours <= 23`, `minutes <= 59`,
    /// `seconds <= 59`); a zero total yields [`ValidationError::ZeroTimeout`].
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self, ValidationError> {
        if hours > 23 {
            return Err(ValidationError::HoursOutOfRange(hours));
        }
        if minutes > 59 {
            return Err(ValidationError::MinutesOutOfRange(minutes));
        }
        if seconds > 59 {
            return Err(ValidationError::SecondsOutOfRange(seconds));
        }
        Self::from_secs(hours * 3600 + minutes * 60 + seconds)
    }

    #[must_use]
    pub fn as_secs(self) -> u32 {
        self.0
    }

    /// Signed duration, convenient for timestamp arithmetic.
    #[must_use]
    pub fn as_time_delta(self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(i64::from(self.0))
    }

    /// Split into `(hours, minutes, seconds)`.
    #[must_use]
    pub fn hms(self) -> (u32, u32, u32) {
        (self.0 / 3600, (self.0 % 3600) / 60, self.0 % 60)
    }
}

impl Default for TimeoutDuration {
    fn default() -> Self {
        Self(DEFAULT_TIMEOUT_SECS)
    }
}

impl TryFrom<u32> for TimeoutDuration {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_secs(value)
    }
}

impl From<TimeoutDuration> for u32 {
    fn from(value: TimeoutDuration) -> Self {
        value.0
    }
}

impl fmt::Display for TimeoutDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(u64::from(self.0)))
    }
}

/// Human-readable rendering such as `"1 hour, 30 minutes"`.
#[must_use]
pub fn format_duration(total_secs: u64) -> String {
    let units = [
        (total_secs / 3600, "hour"),
        ((total_secs % 3600) / 60, "minute"),
        (total_secs % 60, "second"),
    ];
    let parts: Vec<String> = units
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            if *value == 1 {
                format!("1 {unit}")
            } else {
                format!("{value} {unit}s")
            }
        })
        .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}
