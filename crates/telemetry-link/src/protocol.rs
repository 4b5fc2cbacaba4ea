//! Telemetry line protocol
//!
//! The sensor controller prints one line per ping: `D:<centimeters>`.
//! Anything else on the link (boot banners, partial lines after a reset)
//! is noise and must be dropped without touching the stored reading.

use crate::error::LinkError;
use crate::reading::DistanceReading;

/// Prefix of a distance line
pub const DISTANCE_PREFIX: &str = "D:";

/// Parse a single telemetry line into a distance reading
pub fn parse_line(line: &str) -> Result<DistanceReading, LinkError> {
    let value = line
        .trim()
        .strip_prefix(DISTANCE_PREFIX)
        .ok_or_else(|| LinkError::MalformedLine(line.to_string()))?;

    value
        .trim()
        .parse::<u32>()
        .map(DistanceReading::from_cm)
        .map_err(|_| LinkError::MalformedLine(line.to_string()))
}
