//! Distance Telemetry Link
//!
//! This crate reads the line-oriented feed emitted by the rover's sensor
//! microcontroller (`D:<cm>` once per ping) and publishes the latest
//! distance into a shared store. It also opens the serial port that the
//! sensor feed and the motor command link share.

mod error;
mod link;
mod protocol;
mod reading;
pub mod serial;

pub use error::LinkError;
pub use link::{DistanceStore, LinkStats, TelemetryLink};
pub use protocol::{parse_line, DISTANCE_PREFIX};
pub use reading::DistanceReading;
pub use serial::SerialConfig;
