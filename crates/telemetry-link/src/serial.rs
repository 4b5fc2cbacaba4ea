//! Serial port shared by the sensor feed and the motor command link
//!
//! The rover's microcontroller prints `D:<cm>` lines and accepts single
//! command characters on the same USB serial port, so the binary opens it
//! once and splits it into a read half (telemetry) and a write half
//! (command gateway).

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{info, warn};

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Open the port at startup; `false` forces degraded mode
    pub enabled: bool,
    /// Serial port device path (e.g., "/dev/ttyACM0" or "COM3")
    pub device: String,
    /// Baud rate of the microcontroller sketch
    pub baud_rate: u32,
    /// Port timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            timeout_ms: 1000,
        }
    }
}

/// Open the serial port described by `config`
pub fn open(config: &SerialConfig) -> Result<SerialStream, LinkError> {
    if !config.enabled {
        return Err(LinkError::Absent);
    }

    info!("Opening serial link {} at {} baud", config.device, config.baud_rate);
    let stream = tokio_serial::new(&config.device, config.baud_rate)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open_native_async()
        .map_err(|e| {
            warn!("Serial link {} unavailable: {}", config.device, e);
            LinkError::from(e)
        })?;

    info!("Connected to rover controller on {}", config.device);
    Ok(stream)
}
