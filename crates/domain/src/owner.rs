//! Owner — a user account that possesses lights and an auto-timeout policy.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{LightkeeperError, ValidationError};
use crate::id::{DeviceId, OwnerId};
use crate::time::{Timestamp, now};
use crate::timeout::TimeoutDuration;

/// Default "light on too long" window for owners, in seconds.
pub const DEFAULT_NOTIFY_BEFORE_SECS: u32 = 300;

/// Global auto-timeout settings of an owner.
///
/// The defaults (enabled, 600 s timeout, 300 s notification window) are the
/// documented policy for accounts that never touched their settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    pub enabled: bool,
    pub timeout: TimeoutDuration,
    pub notify_before_secs: u32,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: TimeoutDuration::default(),
            notify_before_secs: DEFAULT_NOTIFY_BEFORE_SECS,
        }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub email: String,
    pub username: Option<String>,
    pub timezone: Tz,
    pub policy: TimeoutPolicy,
    /// Controller currently paired with this account.
    pub device_id: Option<DeviceId>,
    pub device_paired_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Owner {
    /// Create a builder for constructing an [`Owner`].
    #[must_use]
    pub fn builder() -> OwnerBuilder {
        OwnerBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] when the contact address
    /// lacks a local part or a domain.
    pub fn validate(&self) -> Result<(), LightkeeperError> {
        validate_email(&self.email)?;
        Ok(())
    }

    /// Name used when addressing the owner in notifications.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }

    /// Merge a partial update into this owner.
    pub fn apply(&mut self, patch: &OwnerPatch) {
        if let Some(email) = &patch.email {
            self.email.clone_from(email);
        }
        if let Some(username) = &patch.username {
            self.username.clone_from(username);
        }
        if let Some(timezone) = patch.timezone {
            self.timezone = timezone;
        }
        if let Some(enabled) = patch.policy_enabled {
            self.policy.enabled = enabled;
        }
        if let Some(timeout) = patch.timeout {
            self.policy.timeout = timeout;
        }
        if let Some(secs) = patch.notify_before_secs {
            self.policy.notify_before_secs = secs;
        }
        if let Some(device) = &patch.device_id {
            self.device_id.clone_from(device);
        }
        if let Some(at) = patch.device_paired_at {
            self.device_paired_at = at;
        }
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}

/// Parse an IANA timezone name.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimezone`] for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

/// Merge-style partial update of an [`Owner`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnerPatch {
    pub email: Option<String>,
    pub username: Option<Option<String>>,
    pub timezone: Option<Tz>,
    pub policy_enabled: Option<bool>,
    pub timeout: Option<TimeoutDuration>,
    pub notify_before_secs: Option<u32>,
    pub device_id: Option<Option<DeviceId>>,
    pub device_paired_at: Option<Option<Timestamp>>,
}

impl OwnerPatch {
    #[must_use]
    pub fn policy_enabled(enabled: bool) -> Self {
        Self {
            policy_enabled: Some(enabled),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn pair_device(device: DeviceId, at: Timestamp) -> Self {
        Self {
            device_id: Some(Some(device)),
            device_paired_at: Some(Some(at)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn unpair_device() -> Self {
        Self {
            device_id: Some(None),
            device_paired_at: Some(None),
            ..Self::default()
        }
    }

    /// Setting a timer always re-enables the policy.
    #[must_use]
    pub fn timeout(timeout: TimeoutDuration) -> Self {
        Self {
            timeout: Some(timeout),
            policy_enabled: Some(true),
            ..Self::default()
        }
    }
}

/// Step-by-step builder for [`Owner`].
#[derive(Debug, Default)]
pub struct OwnerBuilder {
    id: Option<OwnerId>,
    email: Option<String>,
    username: Option<String>,
    timezone: Option<Tz>,
    policy: Option<TimeoutPolicy>,
    created_at: Option<Timestamp>,
}

impl OwnerBuilder {
    #[must_use]
    pub fn id(mut self, id: OwnerId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Owner`].
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::Validation`] if the email is missing or invalid.
    pub fn build(self) -> Result<Owner, LightkeeperError> {
        let owner = Owner {
            id: self.id.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            username: self.username,
            timezone: self.timezone.unwrap_or(Tz::UTC),
            policy: self.policy.unwrap_or_default(),
            device_id: None,
            device_paired_at: None,
            created_at: self.created_at.unwrap_or_else(now),
        };
        owner.validate()?;
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner::builder().email("ana@example.com").build().unwrap()
    }

    #[test]
    fn should_apply_documented_policy_defaults() {
        let policy = owner().policy;
        assert!(policy.enabled);
        assert_eq!(policy.timeout.as_secs(), 600);
        assert_eq!(policy.notify_before_secs, 300);
    }

    #[test]
    fn should_default_timezone_to_utc() {
        assert_eq!(owner().timezone, Tz::UTC);
    }

    #[test]
    fn should_reject_missing_email() {
        let result = Owner::builder().build();
        assert!(matches!(
            result,
            Err(LightkeeperError::Validation(ValidationError::InvalidEmail(_)))
        ));
    }

    #[test]
    fn should_reject_email_without_domain() {
        let result = Owner::builder().email("ana@").build();
        assert!(result.is_err());
    }

    #[test]
    fn should_fall_back_to_email_local_part_for_display_name() {
        assert_eq!(owner().display_name(), "ana");

        let named = Owner::builder()
            .email("ana@example.com")
            .username("Ana")
            .build()
            .unwrap();
        assert_eq!(named.display_name(), "Ana");
    }

    #[test]
    fn should_force_policy_on_when_setting_timeout() {
        let mut o = owner();
        o.policy.enabled = false;

        let timeout = TimeoutDuration::from_secs(120).unwrap();
        o.apply(&OwnerPatch::timeout(timeout));

        assert!(o.policy.enabled);
        assert_eq!(o.policy.timeout, timeout);
    }

    #[test]
    fn should_leave_untouched_fields_alone() {
        let mut o = owner();
        o.apply(&OwnerPatch::policy_enabled(false));
        assert!(!o.policy.enabled);
        assert_eq!(o.email, "ana@example.com");
        assert_eq!(o.policy.timeout.as_secs(), 600);
    }

    #[test]
    fn should_parse_known_timezone() {
        assert_eq!(parse_timezone("Asia/Manila").unwrap(), Tz::Asia__Manila);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn should_pair_and_unpair_device() {
        let mut o = owner();
        assert!(o.device_id.is_none());
        let at = now();

        o.apply(&OwnerPatch::pair_device(DeviceId::new("esp32-a1").unwrap(), at));
        assert_eq!(o.device_id.as_ref().map(DeviceId::as_str), Some("esp32-a1"));
        assert_eq!(o.device_paired_at, Some(at));

        o.apply(&OwnerPatch::unpair_device());
        assert!(o.device_id.is_none());
        assert!(o.device_paired_at.is_none());
    }
}
