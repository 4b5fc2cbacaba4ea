//! Rover Control Core - Main Entry Point

use anyhow::{anyhow, Context};
use api::{
    create_router, init_logging, shutdown_signal, supervise, AppState, Components, RoverConfig,
    ShutdownCause,
};
use arbitration::ControlLoop;
use camera_capture::{open_source, FrameSource};
use command_gateway::CommandGateway;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::sync::Arc;
use telemetry_link::{serial, TelemetryLink};
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};
use vehicle_state::SharedVehicleState;
use vision::{ObjectDetector, PerceptionAdapter, VisionDetector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RoverConfig::load().context("loading configuration")?;
    init_logging(&config.logging).map_err(|e| anyhow!("initializing logging: {}", e))?;

    info!("=== Rover Control Core v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics exporter disabled: {}", e);
            None
        }
    };

    // Bind before anything can drive the motors
    let addr = &config.server.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding operator console to {}", addr))?;
    info!("Operator console listening on {}", addr);

    let shared = Arc::new(SharedVehicleState::new());

    // One serial port carries both the sensor feed and the motor commands
    let (telemetry, gateway) = match serial::open(&config.serial) {
        Ok(stream) => {
            let (reader, writer) = tokio::io::split(stream);
            (TelemetryLink::new(reader), CommandGateway::new(writer))
        }
        Err(e) => {
            info!("Running without serial link: {}", e);
            (TelemetryLink::absent(), CommandGateway::disconnected())
        }
    };
    let sensor_link = !telemetry.is_degraded();
    let actuator_link = gateway.is_connected();
    let gateway = Arc::new(Mutex::new(gateway));

    let telemetry_task = tokio::spawn({
        let shared = shared.clone();
        async move {
            telemetry.run(shared.as_ref()).await;
        }
    });

    let camera = open_source(&config.camera);
    let camera_name = camera.name();
    let detector = VisionDetector::new(&config.vision);
    let detector_available = detector.is_available();

    let control = ControlLoop::new(
        config.control.clone(),
        camera,
        Box::new(detector),
        PerceptionAdapter::new(&config.vision),
        gateway.clone(),
        shared.clone(),
    );
    let mut control_task = tokio::spawn(control.run());

    let state = AppState::new(shared.clone(), gateway.clone())
        .with_metrics(metrics)
        .with_jpeg_quality(config.server.jpeg_quality)
        .with_components(Components {
            sensor_link,
            actuator_link,
            camera: camera_name,
            detector: detector_available,
        });
    let app = create_router(Arc::new(state));

    // The console drains once the supervisor has stopped the motors
    let (console_stop, console_stopped) = oneshot::channel::<()>();
    let console = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            console_stopped.await.ok();
        })
        .into_future();
    let supervisor = {
        let control_task = &mut control_task;
        let gateway = &gateway;
        async move {
            let cause = supervise(control_task, shutdown_signal(), gateway).await;
            console_stop.send(()).ok();
            cause
        }
    };

    let (served, cause) = tokio::join!(console, supervisor);
    telemetry_task.abort();
    served.context("serving operator console")?;

    match cause {
        ShutdownCause::Signal => {
            info!("Rover stopped");
            Ok(())
        }
        ShutdownCause::ControlStopped(reason) => Err(anyhow!("control loop {}", reason)),
    }
}
