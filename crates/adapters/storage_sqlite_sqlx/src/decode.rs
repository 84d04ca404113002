//! Column decoding helpers shared by the repositories.

use std::error::Error;

use chrono::NaiveDate;
use lightkeeper_domain::id::DeviceId;
use lightkeeper_domain::time::{Timestamp, parse_timestamp};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn decode_err<E: Error + Send + Sync + 'static>(err: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    parse_timestamp(value).map_err(decode_err)
}

pub(crate) fn maybe_timestamp(value: Option<String>) -> Result<Option<Timestamp>, sqlx::Error> {
    value.as_deref().map(timestamp).transpose()
}

pub(crate) fn maybe_date(value: Option<String>) -> Result<Option<NaiveDate>, sqlx::Error> {
    value
        .as_deref()
        .map(|text| NaiveDate::parse_from_str(text, DATE_FORMAT))
        .transpose()
        .map_err(decode_err)
}

pub(crate) fn maybe_device(value: Option<String>) -> Result<Option<DeviceId>, sqlx::Error> {
    value.map(DeviceId::new).transpose().map_err(decode_err)
}

/// Encode a timestamp the way every column stores it.
pub(crate) fn encode(ts: Timestamp) -> String {
    ts.to_rfc3339()
}
