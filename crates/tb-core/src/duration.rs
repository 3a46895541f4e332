//! Hour conversions for `chrono::Duration`.
//!
//! Durations are handled at millisecond precision. All rounding happens on
//! whole milliseconds so tenth-hour values are exact.

use chrono::Duration;

/// Milliseconds in one hour.
pub const HOUR_MS: i64 = 3_600_000;

/// Milliseconds in one tenth of an hour, the billing granularity.
pub const TENTH_HOUR_MS: i64 = HOUR_MS / 10;

/// Returns the duration as a fractional hour count.
#[allow(clippy::cast_precision_loss)]
pub fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / HOUR_MS as f64
}

/// Builds a duration from a fractional hour count, to the nearest millisecond.
///
/// Returns `None` for non-finite input or a count too large to represent.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn from_hours(hours: f64) -> Option<Duration> {
    let ms = (hours * HOUR_MS as f64).round();
    // i64::MAX as f64 is 2^63, one past the largest i64
    if !ms.is_finite() || ms <= i64::MIN as f64 || ms >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(ms as i64)
}

/// Returns true if the duration is a whole number of tenth hours.
pub fn is_tenth_multiple(duration: Duration) -> bool {
    duration.num_milliseconds() % TENTH_HOUR_MS == 0
}

/// Serde adapter storing a duration as integer milliseconds.
pub mod serde_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Duration::try_milliseconds(ms).ok_or_else(|| {
            serde::de::Error::custom(format!("duration of {ms}ms is out of range"))
        })
    }
}
