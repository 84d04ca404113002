//! Time and timestamp helpers.
//!
//! Every timestamp that crosses a persistence boundary goes through
//! [`parse_timestamp`] so that naive values are read as UTC before any
//! elapsed-time arithmetic happens.

use chrono::{DateTime, NaiveDateTime, Utc};

/// UTC timestamp used for transitions, deadlines and notifications.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a stored timestamp, normalizing it to UTC.
///
/// RFC 3339 values keep their offset and are converted. Values without any
/// offset are assumed to already be in UTC.
///
/// # Errors
///
/// Returns the last [`chrono::ParseError`] when no accepted format matches.
pub fn parse_timestamp(text: &str) -> Result<Timestamp, chrono::ParseError> {
    let err = match DateTime::parse_from_rfc3339(text) {
        Ok(ts) => return Ok(ts.to_utc()),
        Err(err) => err,
    };
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or(err)
}

/// Seconds elapsed from `earlier` to `later`; negative when `later` is first.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seconds_between(earlier: Timestamp, later: Timestamp) -> f64 {
    let delta = later - earlier;
    delta.num_milliseconds() as f64 / 1000.0
}
