//! Mobility profiles.
//!
//! A profile pairs a travel mode with a speed and converts street distances
//! into durations. Two concrete modes exist; a registry would be overkill.

use std::fmt;

/// Default walking speed, 1.4 m/s (about 5 km/h).
pub const DEFAULT_WALKING_SPEED_MPS: f64 = 1.4;

/// Default driving speed, 13.9 m/s (about 50 km/h, urban).
pub const DEFAULT_DRIVING_SPEED_MPS: f64 = 13.9;

/// Travel mode tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Walking,
    Driving,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Walking => f.write_str("walking"),
            Mode::Driving => f.write_str("driving"),
        }
    }
}

/// A travel mode with its speed in meters per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobilityProfile {
    pub mode: Mode,
    pub speed_mps: f64,
}

impl MobilityProfile {
    /// A walking profile. Non-positive speeds fall back to the default.
    pub fn walking(speed_mps: f64) -> Self {
        Self {
            mode: Mode::Walking,
            speed_mps: if speed_mps > 0.0 {
                speed_mps
            } else {
                DEFAULT_WALKING_SPEED_MPS
            },
        }
    }

    /// A driving profile. Non-positive speeds fall back to the default.
    pub fn driving(speed_mps: f64) -> Self {
        Self {
            mode: Mode::Driving,
            speed_mps: if speed_mps > 0.0 {
                speed_mps
            } else {
                DEFAULT_DRIVING_SPEED_MPS
            },
        }
    }

    /// Time in seconds to cover `distance_m` meters at this profile's speed.
    pub fn travel_time(&self, distance_m: f64) -> f64 {
        if self.speed_mps <= 0.0 {
            return 0.0;
        }
        distance_m / self.speed_mps
    }
}

impl Default for MobilityProfile {
    fn default() -> Self {
        Self::walking(DEFAULT_WALKING_SPEED_MPS)
    }
}
