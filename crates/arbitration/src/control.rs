//! Control loop
//!
//! Samples the shared state, captures a frame, arbitrates, then publishes
//! the frame and mode label and forwards the command to the actuator.

use crate::config::ControlConfig;
use crate::engine::{ArbitrationEngine, OperatorSignals};
use camera_capture::{FrameSource, VideoFrame};
use command_gateway::{CommandGateway, DriveCommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vehicle_state::SharedVehicleState;
use vision::{ObjectDetector, PerceptionAdapter};

/// The rover's decision activity
pub struct ControlLoop {
    engine: ArbitrationEngine,
    camera: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    adapter: PerceptionAdapter,
    gateway: Arc<Mutex<CommandGateway>>,
    shared: Arc<SharedVehicleState>,
    capture_failing: bool,
}

impl ControlLoop {
    pub fn new(
        config: ControlConfig,
        camera: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        adapter: PerceptionAdapter,
        gateway: Arc<Mutex<CommandGateway>>,
        shared: Arc<SharedVehicleState>,
    ) -> Self {
        info!(
            "Creating control loop (camera: {}, detector available: {})",
            camera.name(),
            detector.is_available()
        );
        Self {
            engine: ArbitrationEngine::new(config),
            camera,
            detector,
            adapter,
            gateway,
            shared,
            capture_failing: false,
        }
    }

    /// Run one cycle and return how long to wait before the next
    pub async fn tick(&mut self) -> Duration {
        let signals = OperatorSignals::read(&self.shared);
        let distance = self.shared.distance();
        let now = tokio::time::Instant::now().into_std();

        let mut raw = self.capture();
        let decision = {
            let detector = &self.detector;
            let adapter = &self.adapter;
            self.engine.decide(signals, distance, now, || {
                let frame = raw.take()?;
                let detections = detector.detect(&frame);
                Some(adapter.perceive(&detections, frame))
            })
        };

        let Some(decision) = decision else {
            metrics::counter!("control_cycles_skipped_total").increment(1);
            debug!("No frame; skipping cycle");
            return self.engine.config().autonomous_cadence();
        };

        match decision.perception {
            Some(perception) => self.shared.publish_frame(perception.annotated_frame),
            None => {
                if let Some(frame) = raw {
                    self.shared.publish_frame(frame);
                }
            }
        }

        let previous = self.shared.state();
        if previous != decision.state {
            info!("State {} -> {}", previous, decision.state);
        }
        self.shared.set_state(decision.state);
        metrics::counter!("control_cycles_total", "state" => decision.state.label()).increment(1);

        let mut gateway = self.gateway.lock().await;
        // Kill may have been engaged after the signals were sampled
        let command = if self.shared.is_killed() {
            DriveCommand::Stop
        } else {
            decision.command
        };
        gateway.send(command).await;

        decision.cadence
    }

    /// Cycle forever at the cadence each decision asks for
    pub async fn run(mut self) {
        info!("Control loop running");
        loop {
            let cadence = self.tick().await;
            tokio::time::sleep(cadence).await;
        }
    }

    fn capture(&mut self) -> Option<VideoFrame> {
        match self.camera.capture() {
            Ok(frame) if frame.width > 0 => {
                if self.capture_failing {
                    info!("Camera {} recovered", self.camera.name());
                    self.capture_failing = false;
                }
                Some(frame)
            }
            Ok(_) => {
                debug!("Discarding zero-width frame");
                None
            }
            Err(e) => {
                if !self.capture_failing {
                    warn!("Camera {} capture failed: {}", self.camera.name(), e);
                    self.capture_failing = true;
                } else {
                    debug!("Camera {} capture failed: {}", self.camera.name(), e);
                }
                None
            }
        }
    }
}
