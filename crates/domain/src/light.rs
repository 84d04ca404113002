//! Light — a controllable ON/OFF switch belonging to exactly one owner.
//!
//! State changes are expressed as [`LightPatch`]es. The transition
//! constructors ([`LightPatch::turn_on`], [`LightPatch::manual_off`],
//! [`LightPatch::auto_off`]) always update the status together with the
//! flags that depend on it, so callers cannot produce a light that is OFF
//! with a stale `notification_sent`, or ON with a leftover
//! `auto_turned_off` marker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{DeviceId, LightId, OwnerId};
use crate::owner::TimeoutPolicy;
use crate::time::{Timestamp, seconds_between};

/// Switch position of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightStatus {
    On,
    #[default]
    Off,
}

impl LightStatus {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for LightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

impl FromStr for LightStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// Persisted state of one light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub owner_id: OwnerId,
    pub id: LightId,
    pub name: Option<String>,
    /// Controller wired to this light, if it reports through one.
    pub device_id: Option<DeviceId>,
    pub status: LightStatus,
    /// When the status last changed.
    pub last_transition: Option<Timestamp>,
    pub notification_sent: bool,
    /// Set by a manual OFF command; cleared once observed while ON.
    pub manually_turned_off: bool,
    pub auto_turned_off: bool,
    pub turned_off_at: Option<Timestamp>,
    /// Per-light override of the owner's notification window, in seconds.
    pub notify_after_secs: Option<u32>,
    /// Advisory hint of when auto-off is expected; never authoritative.
    pub timeout_deadline: Option<Timestamp>,
    pub last_notified_at: Option<Timestamp>,
}

impl Light {
    /// A freshly registered light: OFF with every marker cleared.
    #[must_use]
    pub fn new(owner_id: OwnerId, id: LightId) -> Self {
        Self {
            owner_id,
            id,
            name: None,
            device_id: None,
            status: LightStatus::Off,
            last_transition: None,
            notification_sent: false,
            manually_turned_off: false,
            auto_turned_off: false,
            turned_off_at: None,
            notify_after_secs: None,
            timeout_deadline: None,
            last_notified_at: None,
        }
    }

    /// Merge a partial update into this light.
    pub fn apply(&mut self, patch: &LightPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(device) = &patch.device_id {
            self.device_id.clone_from(device);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ts) = patch.last_transition {
            self.last_transition = ts;
        }
        if let Some(sent) = patch.notification_sent {
            self.notification_sent = sent;
        }
        if let Some(flag) = patch.manually_turned_off {
            self.manually_turned_off = flag;
        }
        if let Some(flag) = patch.auto_turned_off {
            self.auto_turned_off = flag;
        }
        if let Some(ts) = patch.turned_off_at {
            self.turned_off_at = ts;
        }
        if let Some(secs) = patch.notify_after_secs {
            self.notify_after_secs = secs;
        }
        if let Some(deadline) = patch.timeout_deadline {
            self.timeout_deadline = deadline;
        }
        if let Some(ts) = patch.last_notified_at {
            self.last_notified_at = ts;
        }
    }

    /// Notification window for this light: its own override, else the owner's.
    #[must_use]
    pub fn effective_notify_after(&self, policy: &TimeoutPolicy) -> u32 {
        self.notify_after_secs.unwrap_or(policy.notify_before_secs)
    }

    /// Countdown details for an ON light under an enabled policy.
    #[must_use]
    pub fn timeout_info(&self, policy: &TimeoutPolicy, now: Timestamp) -> Option<TimeoutInfo> {
        if !self.status.is_on() || !policy.enabled {
            return None;
        }
        let since = self.last_transition?;
        let total = policy.timeout.as_secs();
        let elapsed = seconds_between(since, now).max(0.0);
        let remaining = (f64::from(total) - elapsed).max(0.0);
        Some(TimeoutInfo {
            total_timeout_secs: total,
            elapsed_secs: elapsed,
            remaining_secs: remaining,
            will_turn_off_at: since + policy.timeout.as_time_delta(),
        })
    }
}

/// Derived countdown shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutInfo {
    pub total_timeout_secs: u32,
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    pub will_turn_off_at: Timestamp,
}

/// Merge-style partial update of a [`Light`].
///
/// Plain `Option` fields are "set if `Some`"; `Option<Option<_>>` fields
/// additionally allow clearing with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightPatch {
    pub name: Option<Option<String>>,
    pub device_id: Option<Option<DeviceId>>,
    pub status: Option<LightStatus>,
    pub last_transition: Option<Option<Timestamp>>,
    pub notification_sent: Option<bool>,
    pub manually_turned_off: Option<bool>,
    pub auto_turned_off: Option<bool>,
    pub turned_off_at: Option<Option<Timestamp>>,
    pub notify_after_secs: Option<Option<u32>>,
    pub timeout_deadline: Option<Option<Timestamp>>,
    pub last_notified_at: Option<Option<Timestamp>>,
}

impl LightPatch {
    /// OFF → ON (or a redundant ON): resets every notification/off marker.
    #[must_use]
    pub fn turn_on(at: Timestamp) -> Self {
        Self {
            status: Some(LightStatus::On),
            last_transition: Some(Some(at)),
            notification_sent: Some(false),
            manually_turned_off: Some(false),
            auto_turned_off: Some(false),
            ..Self::default()
        }
    }

    /// ON → OFF requested by a user.
    #[must_use]
    pub fn manual_off(at: Timestamp) -> Self {
        Self {
            manually_turned_off: Some(true),
            ..Self::scheduled_off(at)
        }
    }

    /// ON → OFF performed by the timeout engine.
    #[must_use]
    pub fn auto_off(at: Timestamp) -> Self {
        Self {
            auto_turned_off: Some(true),
            ..Self::scheduled_off(at)
        }
    }

    /// ON → OFF fired by a sleep routine; neither manual nor automatic.
    #[must_use]
    pub fn scheduled_off(at: Timestamp) -> Self {
        Self {
            status: Some(LightStatus::Off),
            last_transition: Some(Some(at)),
            notification_sent: Some(false),
            turned_off_at: Some(Some(at)),
            timeout_deadline: Some(None),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn notified(at: Timestamp) -> Self {
        Self {
            notification_sent: Some(true),
            last_notified_at: Some(Some(at)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deadline(deadline: Option<Timestamp>) -> Self {
        Self {
            timeout_deadline: Some(deadline),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn clear_manual_marker() -> Self {
        Self {
            manually_turned_off: Some(false),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn notify_after(secs: Option<u32>) -> Self {
        Self {
            notify_after_secs: Some(secs),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn device(device: Option<DeviceId>) -> Self {
        Self {
            device_id: Some(device),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(name: Option<String>) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }
}
