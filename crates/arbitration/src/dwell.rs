//! Timed manoeuvres

use crate::config::ControlConfig;
use command_gateway::DriveCommand;
use std::time::{Duration, Instant};
use vehicle_state::VehicleState;

/// One timed command within a dwell sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellStep {
    pub state: VehicleState,
    pub command: DriveCommand,
    pub duration: Duration,
}

impl DwellStep {
    pub fn new(state: VehicleState, command: DriveCommand, duration: Duration) -> Self {
        Self {
            state,
            command,
            duration,
        }
    }
}

/// Ordered timed steps anchored at a start instant
#[derive(Debug, Clone)]
pub struct DwellSequence {
    steps: Vec<DwellStep>,
    started_at: Instant,
}

impl DwellSequence {
    pub fn new(steps: Vec<DwellStep>, started_at: Instant) -> Self {
        Self { steps, started_at }
    }

    /// Hold Stop at the sign, then drive forward past it
    pub fn stop_sign(config: &ControlConfig, now: Instant) -> Self {
        Self::new(
            vec![
                DwellStep::new(
                    VehicleState::StopSignDetected,
                    DriveCommand::Stop,
                    Duration::from_millis(config.stop_sign_hold_ms),
                ),
                DwellStep::new(
                    VehicleState::ClearingStopSign,
                    DriveCommand::Forward,
                    Duration::from_millis(config.stop_sign_clear_ms),
                ),
            ],
            now,
        )
    }

    /// Settle, back away, then turn left
    pub fn reverse(config: &ControlConfig, now: Instant) -> Self {
        let step = |command, ms| {
            DwellStep::new(
                VehicleState::ReversingFromProximity,
                command,
                Duration::from_millis(ms),
            )
        };
        Self::new(
            vec![
                step(DriveCommand::Stop, config.reverse_settle_ms),
                step(DriveCommand::Backward, config.reverse_backup_ms),
                step(DriveCommand::Left, config.reverse_turn_ms),
            ],
            now,
        )
    }

    /// Step active at `now`; `None` once every step has elapsed
    pub fn step_at(&self, now: Instant) -> Option<&DwellStep> {
        let elapsed = now.saturating_duration_since(self.started_at);
        let mut end = Duration::ZERO;
        for step in &self.steps {
            end += step.duration;
            if elapsed < end {
                return Some(step);
            }
        }
        None
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}
