//! Shared vehicle state container

use crate::VehicleState;
use camera_capture::VideoFrame;
use command_gateway::DriveCommand;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use telemetry_link::{DistanceReading, DistanceStore};
use tracing::info;

/// Operator drive intent. Mode and command are always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManualIntent {
    pub active: bool,
    pub command: DriveCommand,
}

/// What the console shows as telemetry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub state: String,
    pub distance: u32,
}

/// Field-synchronized vehicle state.
///
/// Each field is updated atomically on its own; there are no multi-field
/// transactions. Poisoned locks are recovered.
pub struct SharedVehicleState {
    distance: AtomicU32,
    kill: AtomicBool,
    manual: Mutex<ManualIntent>,
    state: RwLock<VehicleState>,
    frame: RwLock<Option<Arc<VideoFrame>>>,
}

impl SharedVehicleState {
    pub fn new() -> Self {
        Self {
            distance: AtomicU32::new(DistanceReading::SENTINEL.cm()),
            kill: AtomicBool::new(false),
            manual: Mutex::new(ManualIntent::default()),
            state: RwLock::new(VehicleState::Idle),
            frame: RwLock::new(None),
        }
    }

    /// Latest distance reading
    pub fn distance(&self) -> DistanceReading {
        DistanceReading::from_cm(self.distance.load(Ordering::Acquire))
    }

    pub fn set_distance(&self, reading: DistanceReading) {
        self.distance.store(reading.cm(), Ordering::Release);
    }

    pub fn is_killed(&self) -> bool {
        self.kill.load(Ordering::Acquire)
    }

    pub fn set_kill(&self, engaged: bool) {
        let was = self.kill.swap(engaged, Ordering::AcqRel);
        if was != engaged {
            info!("Kill switch {}", if engaged { "engaged" } else { "released" });
        }
    }

    pub fn manual_intent(&self) -> ManualIntent {
        *self.manual.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter manual mode driving `command`, and show it as the current mode
    pub fn set_manual(&self, command: DriveCommand) {
        *self.manual.lock().unwrap_or_else(PoisonError::into_inner) = ManualIntent {
            active: true,
            command,
        };
        self.set_state(VehicleState::manual(command));
    }

    /// Leave manual mode; the last manual command is kept
    pub fn resume_autonomy(&self) {
        let mut intent = self.manual.lock().unwrap_or_else(PoisonError::into_inner);
        if intent.active {
            info!("Autonomy resumed");
        }
        intent.active = false;
    }

    pub fn state(&self) -> VehicleState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_state(&self, state: VehicleState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Replace the displayed frame
    pub fn publish_frame(&self, frame: VideoFrame) {
        *self.frame.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(frame));
    }

    /// Latest displayed frame, `None` before the first publish
    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.frame
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            state: self.state().to_string(),
            distance: self.distance().cm(),
        }
    }
}

impl Default for SharedVehicleState {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceStore for SharedVehicleState {
    fn store_distance(&self, reading: DistanceReading) {
        self.set_distance(reading);
    }
}
