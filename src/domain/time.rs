//! GTFS time-of-day handling.
//!
//! GTFS expresses stop times as `HH:MM:SS` strings relative to midnight of
//! the service day, and explicitly allows hours beyond 24 (e.g. `25:30:00`)
//! for trips that run past midnight. This module provides a seconds-based
//! integer time that preserves those values exactly.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

const SECONDS_PER_MINUTE: i32 = 60;
const SECONDS_PER_HOUR: i32 = 3_600;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day on the service day, in seconds since midnight.
///
/// Unlike a wall-clock time, a `TransitTime` may exceed 24 hours: GTFS
/// publishes `25:30:00` for the 01:30 arrival of a trip that departed the
/// previous evening, and those values must compare after `23:59:59` of the
/// same service day. Arithmetic is plain signed integer arithmetic.
///
/// # Examples
///
/// ```
/// use wayfinder::domain::TransitTime;
///
/// let t: TransitTime = "08:30:00".parse().unwrap();
/// assert_eq!(t.seconds(), 8 * 3600 + 30 * 60);
/// assert_eq!(t.to_string(), "08:30:00");
///
/// // Past-midnight times are ordinary values
/// let late: TransitTime = "25:30:00".parse().unwrap();
/// assert!(late > t);
/// ```
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TransitTime(i32);

impl TransitTime {
    /// Construct from a raw seconds-since-midnight value.
    pub const fn from_seconds(seconds: i32) -> Self {
        Self(seconds)
    }

    /// Returns the value in seconds since midnight.
    pub const fn seconds(self) -> i32 {
        self.0
    }

    /// Parse an `HH:MM:SS` string.
    ///
    /// Hours are unbounded (GTFS allows `25:30:00`); minutes and seconds are
    /// two-digit fields. Anything else — a missing field, an extra field, a
    /// non-numeric part — is rejected.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');

        let hours = parse_field(parts.next(), "missing hours")?;
        let minutes = parse_field(parts.next(), "missing minutes")?;
        let seconds = parse_field(parts.next(), "missing seconds")?;

        if parts.next().is_some() {
            return Err(TimeError::new("expected HH:MM:SS"));
        }

        Ok(Self(
            hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE + seconds,
        ))
    }
}

fn parse_field(part: Option<&str>, missing: &'static str) -> Result<i32, TimeError> {
    let part = part.ok_or_else(|| TimeError::new(missing))?;
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new("field must be decimal digits"));
    }
    part.parse()
        .map_err(|_| TimeError::new("field out of range"))
}

impl FromStr for TransitTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add<i32> for TransitTime {
    type Output = Self;

    fn add(self, seconds: i32) -> Self {
        Self(self.0 + seconds)
    }
}

impl Sub<i32> for TransitTime {
    type Output = Self;

    fn sub(self, seconds: i32) -> Self {
        Self(self.0 - seconds)
    }
}

impl Sub for TransitTime {
    type Output = i32;

    /// Difference in seconds; negative when `other` is later.
    fn sub(self, other: Self) -> i32 {
        self.0 - other.0
    }
}

impl fmt::Display for TransitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / SECONDS_PER_HOUR;
        let minutes = (self.0 % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        let seconds = self.0 % SECONDS_PER_MINUTE;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

impl fmt::Debug for TransitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransitTime({self})")
    }
}
