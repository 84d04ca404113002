//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`LightkeeperError`] via `From`, so port boundaries only ever see this enum.

/// Top-level error shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum LightkeeperError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("notification error")]
    Notification(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// A domain invariant was violated by caller-supplied input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("light id must not be empty")]
    EmptyLightId,

    #[error("light id {0:?} is invalid")]
    InvalidLightId(String),

    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("device id {0:?} is invalid")]
    InvalidDeviceId(String),

    #[error("owner id {0:?} is not a valid UUID")]
    InvalidOwnerId(String),

    #[error("email address {0:?} is invalid")]
    InvalidEmail(String),

    #[error("status must be ON or OFF, got {0:?}")]
    InvalidStatus(String),

    #[error("hours must be between 0 and 23, got {0}")]
    HoursOutOfRange(u32),

    #[error("minutes must be between 0 and 59, got {0}")]
    MinutesOutOfRange(u32),

    #[error("seconds must be between 0 and 59, got {0}")]
    SecondsOutOfRange(u32),

    #[error("timeout must be greater than 0")]
    ZeroTimeout,

    #[error("timeout cannot exceed 24 hours, got {0} seconds")]
    TimeoutTooLong(u64),

    #[error("notify duration must be greater than 0")]
    ZeroNotifyDuration,

    #[error("time of day {0:?} must use the HH:MM format")]
    InvalidTimeOfDay(String),

    #[error("at least one of wake-up or sleep must be provided")]
    EmptySchedule,

    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),

    #[error("energy reading must be a finite, non-negative number of Wh, got {0}")]
    InvalidEnergy(String),
}

/// A lookup for a specific resource came back empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_with_from() {
        let err: LightkeeperError = ValidationError::ZeroTimeout.into();
        assert!(matches!(
            err,
            LightkeeperError::Validation(ValidationError::ZeroTimeout)
        ));
    }

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Light",
            id: "main".to_string(),
        };
        assert_eq!(err.to_string(), "Light main not found");
    }

    #[test]
    fn should_keep_storage_source() {
        let io = std::io::Error::other("disk gone");
        let err = LightkeeperError::Storage(Box::new(io));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "disk gone");
    }
}
