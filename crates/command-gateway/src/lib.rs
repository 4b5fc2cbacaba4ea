//! Hardware Command Gateway
//!
//! Converts drive commands into the single-character protocol understood by
//! the motor controller and writes them only when the command changes.

mod command;
mod gateway;

pub use command::{DriveCommand, ParseCommandError};
pub use gateway::{CommandGateway, SendOutcome};

use thiserror::Error;

/// Errors raised by the actuator link
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Actuator link not connected")]
    LinkAbsent,
    #[error("Actuator write failed: {0}")]
    WriteFailed(String),
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::WriteFailed(err.to_string())
    }
}
