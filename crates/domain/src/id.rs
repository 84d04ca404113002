//! Typed identifiers.
//!
//! Owners are keyed by UUID. Lights are keyed by a short string that is only
//! unique within their owner (`"main"`, `"bedroom"`, …), so the full key of a
//! light is always the `(OwnerId, LightId)` pair. Devices use the same kind of
//! string key, chosen by the hardware.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an [`Owner`](crate::owner::Owner).
    OwnerId
);

const MAX_KEY_LEN: usize = 64;

macro_rules! define_key {
    ($(#[doc = $doc:expr])* $name:ident, $empty:ident, $invalid:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a key.
            ///
            /// # Errors
            ///
            #[doc = concat!("Returns [`ValidationError::", stringify!($empty), "`] for an empty key and")]
            #[doc = concat!("[`ValidationError::", stringify!($invalid), "`] when the key is too long or")]
            /// contains whitespace or `/`.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(ValidationError::$empty);
                }
                if value.len() > MAX_KEY_LEN
                    || value.chars().any(|c| c == '/' || c.is_whitespace())
                {
                    return Err(ValidationError::$invalid(value));
                }
                Ok(Self(value))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_key!(
    /// Key of a [`Light`](crate::light::Light), unique within its owner.
    LightId,
    EmptyLightId,
    InvalidLightId
);

define_key!(
    /// Hardware identifier a controller reports itself with.
    ///
    /// A device is paired with at most one owner at a time.
    DeviceId,
    EmptyDeviceId,
    InvalidDeviceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = OwnerId::new();
        let b = OwnerId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn should_roundtrip_through_display_and_from_str() {
        let id = OwnerId::new();
        let text = id.to_string();
        let parsed: OwnerId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_return_error_when_parsing_invalid_uuid() {
        let result = OwnerId::from_str("not-a-uuid");
        assert!(result.is_err());
    }

    #[test]
    fn should_accept_simple_light_key() {
        let id = LightId::new("main").unwrap();
        assert_eq!(id.as_str(), "main");
        assert_eq!(id.to_string(), "main");
    }

    #[test]
    fn should_reject_empty_light_key() {
        assert_eq!(LightId::new(""), Err(ValidationError::EmptyLightId));
    }

    #[test]
    fn should_reject_light_key_with_slash_or_space() {
        assert!(matches!(
            LightId::new("a/b"),
            Err(ValidationError::InvalidLightId(_))
        ));
        assert!(matches!(
            LightId::new("living room"),
            Err(ValidationError::InvalidLightId(_))
        ));
    }

    #[test]
    fn should_reject_overlong_light_key() {
        let long = "x".repeat(MAX_KEY_LEN + 1);
        assert!(LightId::new(long).is_err());
    }

    #[test]
    fn should_validate_light_key_when_deserializing() {
        let ok: LightId = serde_json::from_str("\"porch\"").unwrap();
        assert_eq!(ok.as_str(), "porch");

        let bad: Result<LightId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn should_validate_device_key_like_light_key() {
        assert_eq!(DeviceId::new("esp32-a1").unwrap().as_str(), "esp32-a1");
        assert_eq!(DeviceId::new(""), Err(ValidationError::EmptyDeviceId));
        assert!(matches!(
            "esp 32".parse::<DeviceId>(),
            Err(ValidationError::InvalidDeviceId(_))
        ));
    }
}
