//! Core type definitions with validation.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A recorded duration was negative.
    #[error("duration cannot be negative, got {ms}ms")]
    NegativeDuration { ms: i64 },

    /// A recorded duration was longer than one record may hold.
    #[error("duration cannot exceed 24 hours, got {ms}ms")]
    DurationTooLong { ms: i64 },

    /// The billing rate was negative or not a number.
    #[error("rate must be a finite non-negative number, got {value}")]
    InvalidRate { value: f64 },
}

/// Generates a validated string label newtype with common trait implementations.
macro_rules! define_label {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new label after trimming and validation.
            pub fn new(label: impl Into<String>) -> Result<Self, ValidationError> {
                let label = label.into();
                let trimmed = label.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the label as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(label: $name) -> Self {
                label.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_label!(
    /// A validated project name.
    ProjectName, "project"
);

define_label!(
    /// A validated activity label (e.g., "design", "code review").
    ActivityName, "activity"
);

/// Longest duration a single [`TimeRecord`] may hold.
pub const MAX_RECORD_HOURS: i64 = 24;

/// A single piece of recorded work, before any aggregation or rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct TimeRecord {
    /// Day the work was done.
    pub date: NaiveDate,
    /// Project the work is billed to.
    pub project: ProjectName,
    /// What was done.
    pub activity: ActivityName,
    /// Exact time spent.
    #[serde(rename = "duration_ms", with = "crate::duration::serde_millis")]
    pub duration: Duration,
}

impl TimeRecord {
    /// Creates a record, rejecting empty labels and durations that are
    /// negative or longer than [`MAX_RECORD_HOURS`].
    pub fn new(
        date: NaiveDate,
        project: impl Into<String>,
        activity: impl Into<String>,
        duration: Duration,
    ) -> Result<Self, ValidationError> {
        if duration < Duration::zero() {
            return Err(ValidationError::NegativeDuration {
                ms: duration.num_milliseconds(),
            });
        }
        if duration > Duration::hours(MAX_RECORD_HOURS) {
            return Err(ValidationError::DurationTooLong {
                ms: duration.num_milliseconds(),
            });
        }
        Ok(Self {
            date,
            project: ProjectName::new(project)?,
            activity: ActivityName::new(activity)?,
            duration,
        })
    }
}

/// Unvalidated [`TimeRecord`] fields as they arrive from deserialization.
#[derive(Deserialize)]
struct RecordFields {
    date: NaiveDate,
    project: String,
    activity: String,
    #[serde(rename = "duration_ms", with = "crate::duration::serde_millis")]
    duration: Duration,
}

impl TryFrom<RecordFields> for TimeRecord {
    type Error = ValidationError;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        Self::new(fields.date, fields.project, fields.activity, fields.duration)
    }
}

/// An hourly billing rate.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Rate(f64);

impl Rate {
    /// Creates a rate after validation.
    ///
    /// Returns an error if the value is negative, infinite or NaN.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidRate { value });
        }
        Ok(Self(value))
    }

    /// Returns the inner f64 value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns true if nothing would be charged at this rate.
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<f64> for Rate {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Rate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}
