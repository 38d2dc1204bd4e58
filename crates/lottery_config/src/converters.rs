//! Utils for serialization and deserialization of nested config fields into simple types.
//! These conversions let the command line updater (which supports only numbers strings and
//! booleans) handle these fields.
//!
//! # example
//!
//! ```
//! use std::time::Duration;
//!
//! use lottery_config::converters::deserialize_milliseconds_to_duration;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Clone, Deserialize, Debug, PartialEq)]
//! struct DurationConfig {
//!     #[serde(deserialize_with = "deserialize_milliseconds_to_duration")]
//!     dur: Duration,
//! }
//!
//! let loaded_config: DurationConfig = serde_json::from_value(json!({ "dur": 1000 })).unwrap();
//! assert_eq!(loaded_config.dur.as_secs(), 1);
//! ```

use std::time::Duration;

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};
use url::Url;

#[cfg(test)]
#[path = "converters_test.rs"]
mod converters_test;

/// Deserializes milliseconds to duration object.
pub fn deserialize_milliseconds_to_duration<'de, D>(de: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis: u64 = Deserialize::deserialize(de)?;
    Ok(Duration::from_millis(millis))
}

/// Serializes a duration as whole milliseconds, the inverse of
/// [`deserialize_milliseconds_to_duration`].
pub fn serialize_duration_as_milliseconds<S>(duration: &Duration, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).map_err(serde::ser::Error::custom)?;
    ser.serialize_u64(millis)
}

/// Serializes a `&[Url]` into a single space-separated string.
pub fn serialize_slice_url(vector: &[Url]) -> String {
    vector.iter().map(Url::as_str).collect::<Vec<_>>().join(" ")
}

/// Serde adapter for [`serialize_slice_url`].
pub fn serialize_vec_url<S>(vector: &[Url], ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ser.serialize_str(&serialize_slice_url(vector))
}

/// Deserializes a space-separated string into a `Vec<Url>`.
/// Returns an error if any of the substrings cannot be parsed into a valid URL.
pub fn deserialize_vec_url<'de, D>(de: D) -> Result<Vec<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: String = <String as serde::Deserialize>::deserialize(de)?;

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    raw.split_whitespace()
        .map(|s| Url::parse(s).map_err(|e| D::Error::custom(format!("Invalid URL '{}': {}", s, e))))
        .collect()
}
