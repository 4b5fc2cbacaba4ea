//! Control loop configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Arbitration thresholds, cadences and dwell timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Readings strictly between 0 and this trigger the reverse manoeuvre (cm)
    pub stop_distance_cm: u32,

    /// Cycle period in autonomous mode and during dwells (ms)
    pub autonomous_cadence_ms: u64,

    /// Cycle period under manual control (ms)
    pub manual_cadence_ms: u64,

    /// Cycle period while the kill switch is engaged (ms)
    pub halted_cadence_ms: u64,

    /// Stop held after a stop sign is seen (ms)
    pub stop_sign_hold_ms: u64,

    /// Forward drive past the sign before re-arbitrating (ms)
    pub stop_sign_clear_ms: u64,

    /// Stop before backing away from a close obstacle (ms)
    pub reverse_settle_ms: u64,

    /// Backward drive (ms)
    pub reverse_backup_ms: u64,

    /// Left turn after backing up (ms)
    pub reverse_turn_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            stop_distance_cm: 25,
            autonomous_cadence_ms: 50,
            manual_cadence_ms: 100,
            halted_cadence_ms: 500,
            stop_sign_hold_ms: 3000,
            stop_sign_clear_ms: 1000,
            reverse_settle_ms: 200,
            reverse_backup_ms: 500,
            reverse_turn_ms: 400,
        }
    }
}

impl ControlConfig {
    pub fn autonomous_cadence(&self) -> Duration {
        Duration::from_millis(self.autonomous_cadence_ms)
    }

    pub fn manual_cadence(&self) -> Duration {
        Duration::from_millis(self.manual_cadence_ms)
    }

    pub fn halted_cadence(&self) -> Duration {
        Duration::from_millis(self.halted_cadence_ms)
    }
}
