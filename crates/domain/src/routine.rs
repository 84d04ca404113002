//! Wake/sleep routines — daily time-of-day ON/OFF triggers for one light each.
//!
//! A routine fires at most once per local calendar day per kind. Matching
//! tolerates a few minutes of slack so a checker running every minute never
//! misses the window.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{LightkeeperError, ValidationError};
use crate::id::{LightId, OwnerId};

/// How far from the configured minute a trigger still counts as due.
pub const TRIGGER_TOLERANCE_MINUTES: i64 = 3;

/// Wall-clock minute of the day, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    #[must_use]
    pub fn as_naive(self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(Self)
            .map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Which half of the routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    WakeUp,
    Sleep,
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WakeUp => f.write_str("wake_up"),
            Self::Sleep => f.write_str("sleep"),
        }
    }
}

/// A single daily trigger: switch `light_id` at `at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineTrigger {
    pub at: TimeOfDay,
    pub light_id: LightId,
}

/// Per-owner wake/sleep configuration plus the per-day "already fired" markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeSleepRoutine {
    pub owner_id: OwnerId,
    pub wake_up: Option<RoutineTrigger>,
    pub sleep: Option<RoutineTrigger>,
    pub wake_up_last_fired: Option<NaiveDate>,
    pub sleep_last_fired: Option<NaiveDate>,
}

impl WakeSleepRoutine {
    /// Build a routine, requiring at least one trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySchedule`] when both triggers are absent.
    pub fn new(
        owner_id: OwnerId,
        wake_up: Option<RoutineTrigger>,
        sleep: Option<RoutineTrigger>,
    ) -> Result<Self, LightkeeperError> {
        let routine = Self {
            owner_id,
            wake_up,
            sleep,
            wake_up_last_fired: None,
            sleep_last_fired: None,
        };
        routine.validate()?;
        Ok(routine)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySchedule`] when both triggers are absent.
    pub fn validate(&self) -> Result<(), LightkeeperError> {
        if self.wake_up.is_none() && self.sleep.is_none() {
            return Err(ValidationError::EmptySchedule.into());
        }
        Ok(())
    }

    #[must_use]
    pub fn trigger(&self, kind: RoutineKind) -> Option<&RoutineTrigger> {
        match kind {
            RoutineKind::WakeUp => self.wake_up.as_ref(),
            RoutineKind::Sleep => self.sleep.as_ref(),
        }
    }

    #[must_use]
    pub fn last_fired(&self, kind: RoutineKind) -> Option<NaiveDate> {
        match kind {
            RoutineKind::WakeUp => self.wake_up_last_fired,
            RoutineKind::Sleep => self.sleep_last_fired,
        }
    }

    /// The trigger to fire now, if any.
    ///
    /// Due means: configured, within [`TRIGGER_TOLERANCE_MINUTES`] of the
    /// configured minute on the local date, and not yet fired that date.
    #[must_use]
    pub fn due(&self, kind: RoutineKind, local_now: &DateTime<Tz>) -> Option<&RoutineTrigger> {
        let trigger = self.trigger(kind)?;
        let today = local_now.date_naive();
        if self.last_fired(kind) == Some(today) {
            return None;
        }
        let target = today.and_time(trigger.at.as_naive());
        let delta = (local_now.naive_local() - target).abs();
        (delta <= TimeDelta::minutes(TRIGGER_TOLERANCE_MINUTES)).then_some(trigger)
    }

    pub fn mark_fired(&mut self, kind: RoutineKind, date: NaiveDate) {
        match kind {
            RoutineKind::WakeUp => self.wake_up_last_fired = Some(date),
            RoutineKind::Sleep => self.sleep_last_fired = Some(date),
        }
    }
}
