//! Arbitration state machine

use crate::config::ControlConfig;
use crate::dwell::DwellSequence;
use command_gateway::DriveCommand;
use std::time::{Duration, Instant};
use telemetry_link::DistanceReading;
use tracing::{debug, info};
use vehicle_state::{ManualIntent, SharedVehicleState, VehicleState};
use vision::PerceptionResult;

/// Operator inputs sampled at the start of a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorSignals {
    pub kill: bool,
    pub manual: ManualIntent,
}

impl OperatorSignals {
    pub fn read(shared: &SharedVehicleState) -> Self {
        Self {
            kill: shared.is_killed(),
            manual: shared.manual_intent(),
        }
    }
}

/// Outcome of one arbitration pass
#[derive(Debug, Clone)]
pub struct Decision {
    pub state: VehicleState,
    pub command: DriveCommand,
    /// Wait before the next cycle
    pub cadence: Duration,
    /// Set when this pass ran detection
    pub perception: Option<PerceptionResult>,
}

impl Decision {
    fn new(state: VehicleState, command: DriveCommand, cadence: Duration) -> Self {
        Self {
            state,
            command,
            cadence,
            perception: None,
        }
    }
}

/// Priority arbiter over kill, manual and autonomous signals
pub struct ArbitrationEngine {
    config: ControlConfig,
    dwell: Option<DwellSequence>,
}

impl ArbitrationEngine {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            dwell: None,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Whether a timed manoeuvre is in progress
    pub fn in_dwell(&self) -> bool {
        self.dwell.is_some()
    }

    /// Decide the next command.
    ///
    /// `perceive` runs only when the autonomous hazards are evaluated; it
    /// returns `None` when no usable frame was captured, in which case the
    /// cycle is skipped and `None` is returned.
    pub fn decide<F>(
        &mut self,
        signals: OperatorSignals,
        distance: DistanceReading,
        now: Instant,
        perceive: F,
    ) -> Option<Decision>
    where
        F: FnOnce() -> Option<PerceptionResult>,
    {
        if signals.kill {
            self.cancel_dwell("kill switch");
            return Some(Decision::new(
                VehicleState::Halted,
                DriveCommand::Stop,
                self.config.halted_cadence(),
            ));
        }

        if signals.manual.active {
            self.cancel_dwell("manual override");
            let command = signals.manual.command;
            return Some(Decision::new(
                VehicleState::manual(command),
                command,
                self.config.manual_cadence(),
            ));
        }

        if let Some(dwell) = &self.dwell {
            if let Some(step) = dwell.step_at(now) {
                return Some(Decision::new(
                    step.state,
                    step.command,
                    self.config.autonomous_cadence(),
                ));
            }
            debug!("Dwell sequence complete");
            self.dwell = None;
        }

        let perception = perceive()?;
        let (state, command) = self.evaluate(&perception, distance, now);

        Some(Decision {
            state,
            command,
            cadence: self.config.autonomous_cadence(),
            perception: Some(perception),
        })
    }

    fn evaluate(
        &mut self,
        perception: &PerceptionResult,
        distance: DistanceReading,
        now: Instant,
    ) -> (VehicleState, DriveCommand) {
        if perception.stop_sign_seen {
            info!("Stop sign detected; holding");
            return self.start_dwell(DwellSequence::stop_sign(&self.config, now), now);
        }

        if distance.is_closer_than(self.config.stop_distance_cm) {
            info!("Obstacle at {} cm; reversing", distance.cm());
            return self.start_dwell(DwellSequence::reverse(&self.config, now), now);
        }

        if perception.is_blocked {
            let third = perception.frame_width as f32 / 3.0;
            return match perception.obstacle_center_x {
                Some(x) if x < third => (VehicleState::SwervingRight, DriveCommand::Right),
                Some(x) if x > 2.0 * third => (VehicleState::SwervingLeft, DriveCommand::Left),
                _ => (VehicleState::BlockedCenterTurning, DriveCommand::Left),
            };
        }

        (VehicleState::Forward, DriveCommand::Forward)
    }

    fn start_dwell(&mut self, dwell: DwellSequence, now: Instant) -> (VehicleState, DriveCommand) {
        let first = dwell
            .step_at(now)
            .map(|step| (step.state, step.command))
            .unwrap_or((VehicleState::Forward, DriveCommand::Forward));
        self.dwell = Some(dwell);
        first
    }

    fn cancel_dwell(&mut self, reason: &str) {
        if self.dwell.take().is_some() {
            info!("Dwell sequence cancelled by {}", reason);
        }
    }
}

impl Default for ArbitrationEngine {
    fn default() -> Self {
        Self::new(ControlConfig::default())
    }
}
