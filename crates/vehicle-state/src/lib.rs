//! Vehicle State
//!
//! Holds the rover's single source of truth: latest distance, latest
//! annotated frame, mode label, kill flag and manual-drive intent. The
//! telemetry link, control loop and operator console each hold an
//! `Arc<SharedVehicleState>`.

mod shared;

pub use shared::{ManualIntent, SharedVehicleState, TelemetrySnapshot};

use command_gateway::DriveCommand;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable vehicle mode. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleState {
    #[default]
    Idle,
    Forward,
    ReversingFromProximity,
    SwervingLeft,
    SwervingRight,
    BlockedCenterTurning,
    StopSignDetected,
    ClearingStopSign,
    Halted,
    ManualForward,
    ManualBackward,
    ManualLeft,
    ManualRight,
    ManualStop,
    KillSwitchActive,
}

impl VehicleState {
    /// Manual-mode label for an operator command
    pub fn manual(command: DriveCommand) -> Self {
        match command {
            DriveCommand::Forward => VehicleState::ManualForward,
            DriveCommand::Backward => VehicleState::ManualBackward,
            DriveCommand::Left => VehicleState::ManualLeft,
            DriveCommand::Right => VehicleState::ManualRight,
            DriveCommand::Stop => VehicleState::ManualStop,
        }
    }

    /// Operator console label
    pub fn label(&self) -> &'static str {
        match self {
            VehicleState::Idle => "IDLE",
            VehicleState::Forward => "FORWARD",
            VehicleState::ReversingFromProximity => "TOO CLOSE: Reversing",
            VehicleState::SwervingLeft => "SWERVING LEFT",
            VehicleState::SwervingRight => "SWERVING RIGHT",
            VehicleState::BlockedCenterTurning => "BLOCKED CENTER: Turning",
            VehicleState::StopSignDetected => "STOP SIGN DETECTED",
            VehicleState::ClearingStopSign => "CLEARING SIGN",
            VehicleState::Halted => "HALTED",
            VehicleState::ManualForward => "MANUAL: FORWARD",
            VehicleState::ManualBackward => "MANUAL: BACKWARD",
            VehicleState::ManualLeft => "MANUAL: LEFT",
            VehicleState::ManualRight => "MANUAL: RIGHT",
            VehicleState::ManualStop => "MANUAL: STOP",
            VehicleState::KillSwitchActive => "KILL SWITCH ACTIVATED",
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            VehicleState::ManualForward
                | VehicleState::ManualBackward
                | VehicleState::ManualLeft
                | VehicleState::ManualRight
                | VehicleState::ManualStop
        )
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
