//! Telemetry Link Error Types

use thiserror::Error;

/// Errors that can occur while reading the sensor link
#[derive(Debug, Error)]
pub enum LinkError {
    /// Serial port I/O error
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Line did not match `D:<integer>`
    #[error("Malformed telemetry line: {0:?}")]
    MalformedLine(String),

    /// No sensor link was available at startup
    #[error("Sensor link not connected")]
    Absent,

    /// The link reached end of stream
    #[error("Sensor link closed")]
    Closed,
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Serial(err.to_string())
    }
}

impl From<tokio_serial::Error> for LinkError {
    fn from(err: tokio_serial::Error) -> Self {
        LinkError::Serial(err.to_string())
    }
}
