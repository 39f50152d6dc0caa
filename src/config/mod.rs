//! Run configuration.
//!
//! Loads and validates the YAML file describing one playback: motion
//! preference, seed, frame interval, which stage elements exist and how
//! the ambient loop is paced. Every field has a default, so an empty
//! mapping (or no file at all) yields a complete configuration.

pub mod loader;
pub mod schema;

use std::time::Duration;

use crate::error::ConfigError;

pub use loader::{ConfigLoader, LoadResult};
pub use schema::{AmbientConfig, ParticlesConfig, RunConfig, StageConfig};

/// Parses a duration string.
///
/// Accepts the compact single-unit forms `"150ms"`, `"2s"`, `"5m"`, `"1h"`
/// and falls back to humantime for compound forms such as `"1s 500ms"`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the string is not a duration.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidValue {
        field: "duration".to_string(),
        value: s.to_string(),
        expected: "a duration such as '150ms', '2s' or '1s 500ms'".to_string(),
    };

    let single = |digits: &str, unit: fn(u64) -> Duration| -> Option<Duration> {
        digits.trim().parse::<u64>().ok().map(unit)
    };

    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        single(ms, Duration::from_millis)
    } else if let Some(h) = s.strip_suffix('h') {
        single(h, |n| Duration::from_secs(n.saturating_mul(3600)))
    } else if let Some(m) = s.strip_suffix('m') {
        single(m, |n| Duration::from_secs(n.saturating_mul(60)))
    } else if let Some(secs) = s.strip_suffix('s') {
        single(secs, Duration::from_secs)
    } else {
        None
    };

    parsed
        .or_else(|| humantime::parse_duration(s).ok())
        .ok_or_else(invalid)
}

/// Serde adapter for [`Duration`] fields.
///
/// Serializes as a humantime string (`"800ms"`, `"2s"`); deserializes from
/// either such a string or a bare integer number of milliseconds.
pub mod duration_serde {
    use std::fmt;
    use std::time::Duration;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    /// Serializes a duration as a humantime string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if d.is_zero() {
            return serializer.serialize_str("0ms");
        }
        serializer.collect_str(&humantime::format_duration(*d))
    }

    /// Deserializes a duration from a string or integer milliseconds.
    ///
    /// # Errors
    ///
    /// Fails on negative numbers and unparseable strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration string like \"800ms\" or integer milliseconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_millis)
                .map_err(|_| E::custom(format!("negative duration: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            super::parse_duration(v).map_err(E::custom)
        }
    }
}
