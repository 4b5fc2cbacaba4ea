//! Distance readings reported by the ultrasonic sensor

use serde::{Deserialize, Serialize};

/// Distance to the nearest echo in centimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceReading(u32);

impl DistanceReading {
    /// "No obstacle known". The firmware reports the same value when no echo
    /// comes back within its pulse timeout.
    pub const SENTINEL: Self = Self(100);

    /// Create a reading from a centimeter value
    pub const fn from_cm(cm: u32) -> Self {
        Self(cm)
    }

    /// Distance in centimeters
    pub const fn cm(self) -> u32 {
        self.0
    }

    /// True when the reading is a real echo closer than `threshold_cm`.
    ///
    /// Zero is never "close": the sensor emits it for a failed measurement.
    pub const fn is_closer_than(self, threshold_cm: u32) -> bool {
        self.0 > 0 && self.0 < threshold_cm
    }
}

impl Default for DistanceReading {
    fn default() -> Self {
        Self::SENTINEL
    }
}

impl From<u32> for DistanceReading {
    fn from(cm: u32) -> Self {
        Self(cm)
    }
}
