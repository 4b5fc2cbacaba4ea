//! Process supervision
//!
//! Watches the control task alongside the shutdown signals. Whichever ends
//! first, the motors are forced to Stop before the process exits.

use command_gateway::CommandGateway;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Why the rover is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// Ctrl-C or SIGTERM
    Signal,
    /// The control task ended on its own
    ControlStopped(String),
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Wait for `signal` or for the control task to end, then stop the control
/// task and write a final Stop to the actuator
pub async fn supervise<F>(
    control_task: &mut JoinHandle<()>,
    signal: F,
    gateway: &Mutex<CommandGateway>,
) -> ShutdownCause
where
    F: Future<Output = ()>,
{
    let cause = tokio::select! {
        _ = signal => ShutdownCause::Signal,
        result = &mut *control_task => ShutdownCause::ControlStopped(match result {
            Ok(()) => "returned".to_string(),
            Err(e) if e.is_panic() => "panicked".to_string(),
            Err(e) => e.to_string(),
        }),
    };

    match &cause {
        ShutdownCause::Signal => info!("Shutdown signal received; stopping rover"),
        ShutdownCause::ControlStopped(reason) => {
            error!("Control loop {}; stopping rover", reason)
        }
    }

    control_task.abort();
    gateway.lock().await.force_stop().await;
    cause
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbitration::{ControlConfig, ControlLoop};
    use camera_capture::{CameraError, FrameSource, VideoFrame};
    use command_gateway::DriveCommand;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use vehicle_state::SharedVehicleState;
    use vision::{PerceptionAdapter, VisionConfig, VisionDetector};

    /// Camera whose driver blows up on first use
    struct PanickingCamera;

    impl FrameSource for PanickingCamera {
        fn capture(&mut self) -> Result<VideoFrame, CameraError> {
            panic!("camera driver fault");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_control_panic_forces_stop() {
        let (link, mut actuator) = tokio::io::duplex(64);
        let gateway = Arc::new(Mutex::new(CommandGateway::new(link)));
        gateway.lock().await.send(DriveCommand::Forward).await;

        let control = ControlLoop::new(
            ControlConfig::default(),
            Box::new(PanickingCamera),
            Box::new(VisionDetector::new(&VisionConfig::default())),
            PerceptionAdapter::default(),
            gateway.clone(),
            Arc::new(SharedVehicleState::new()),
        );
        let mut control_task = tokio::spawn(control.run());

        let cause = supervise(&mut control_task, std::future::pending(), &gateway).await;

        assert_eq!(cause, ShutdownCause::ControlStopped("panicked".to_string()));
        let mut written = [0u8; 8];
        let n = actuator.read(&mut written).await.unwrap();
        assert_eq!(&written[..n], b"FS");
    }

    #[tokio::test]
    async fn test_signal_aborts_control_and_stops() {
        let (link, mut actuator) = tokio::io::duplex(64);
        let gateway = Mutex::new(CommandGateway::new(link));
        gateway.lock().await.send(DriveCommand::Stop).await;

        let mut control_task = tokio::spawn(std::future::pending::<()>());

        let cause = supervise(&mut control_task, async {}, &gateway).await;

        assert_eq!(cause, ShutdownCause::Signal);
        assert!(control_task.await.unwrap_err().is_cancelled());
        // Stop is rewritten even though it was the last command sent
        let mut written = [0u8; 8];
        let n = actuator.read(&mut written).await.unwrap();
        assert_eq!(&written[..n], b"SS");
    }

    #[tokio::test]
    async fn test_returning_control_loop_is_reported() {
        let gateway = Mutex::new(CommandGateway::disconnected());
        let mut control_task = tokio::spawn(async {});

        let cause = supervise(&mut control_task, std::future::pending(), &gateway).await;

        assert_eq!(cause, ShutdownCause::ControlStopped("returned".to_string()));
    }
}
