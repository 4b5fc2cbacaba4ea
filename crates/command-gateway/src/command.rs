//! Drive commands and their wire tokens

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Motion command understood by the motor controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveCommand {
    /// Both tracks forward
    Forward,
    /// Both tracks backward
    Backward,
    /// Spin left in place
    Left,
    /// Spin right in place
    Right,
    /// All motor pins low
    #[default]
    Stop,
}

impl DriveCommand {
    /// All commands, in token order
    pub const ALL: [DriveCommand; 5] = [
        DriveCommand::Forward,
        DriveCommand::Backward,
        DriveCommand::Left,
        DriveCommand::Right,
        DriveCommand::Stop,
    ];

    /// Byte written to the actuator link
    pub fn token(&self) -> u8 {
        match self {
            DriveCommand::Forward => b'F',
            DriveCommand::Backward => b'B',
            DriveCommand::Left => b'L',
            DriveCommand::Right => b'R',
            DriveCommand::Stop => b'S',
        }
    }

    /// Operator-facing direction name
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveCommand::Forward => "forward",
            DriveCommand::Backward => "backward",
            DriveCommand::Left => "left",
            DriveCommand::Right => "right",
            DriveCommand::Stop => "stop",
        }
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction name that is not a drive command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown drive command: {0:?}")]
pub struct ParseCommandError(pub String);

impl FromStr for DriveCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        DriveCommand::ALL
            .into_iter()
            .find(|cmd| cmd.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseCommandError(s.to_string()))
    }
}
