//! Rover Operator Console
//!
//! HTTP surface over the shared vehicle state: telemetry, frame snapshots,
//! kill switch and manual drive. Also carries configuration loading,
//! logging setup and process supervision for the `rover` binary.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use command_gateway::CommandGateway;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vehicle_state::SharedVehicleState;

pub mod config;
mod routes;
pub mod supervisor;

pub use config::{ConfigError, LoggingConfig, RoverConfig, ServerConfig};
pub use supervisor::{shutdown_signal, supervise, ShutdownCause};

/// Console errors, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No frame captured yet")]
    NoFrame,

    #[error("Unknown drive command: {0}")]
    UnknownCommand(String),

    #[error("Frame encoding failed: {0}")]
    Encode(String),

    #[error("Metrics exporter not installed")]
    MetricsDisabled,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NoFrame => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UnknownCommand(_) => StatusCode::BAD_REQUEST,
            ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MetricsDisabled => StatusCode::NOT_FOUND,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Hardware found at startup
#[derive(Debug, Clone, Copy, Default)]
pub struct Components {
    pub sensor_link: bool,
    pub actuator_link: bool,
    pub camera: &'static str,
    pub detector: bool,
}

/// Application state shared across handlers
pub struct AppState {
    /// Vehicle state written by the console, read by the control loop
    pub shared: Arc<SharedVehicleState>,
    /// Actuator gateway, shared with the control loop
    pub gateway: Arc<Mutex<CommandGateway>>,
    /// Prometheus exposition, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Startup hardware inventory
    pub components: Components,
    /// Snapshot JPEG quality
    pub jpeg_quality: u8,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(shared: Arc<SharedVehicleState>, gateway: Arc<Mutex<CommandGateway>>) -> Self {
        Self {
            shared,
            gateway,
            metrics: None,
            components: Components::default(),
            jpeg_quality: ServerConfig::default().jpeg_quality,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    pub fn with_components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub state: String,
    pub kill_switch: bool,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub sensor_link: ComponentHealth,
    pub actuator_link: ComponentHealth,
    pub camera: ComponentHealth,
    pub detector: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ComponentHealth {
    fn from_available(available: bool) -> Self {
        Self {
            status: if available { "ok" } else { "absent" }.to_string(),
            source: None,
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/telemetry", get(routes::telemetry::get_telemetry))
        .route("/api/v1/frame", get(routes::telemetry::get_frame))
        .route("/api/v1/kill", post(routes::control::kill))
        .route("/api/v1/reset", post(routes::control::reset))
        .route("/api/v1/manual", post(routes::control::manual))
        .route("/api/v1/resume", post(routes::control::resume))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let components = state.components;
    let camera_ok = components.camera != "none";
    let healthy = components.sensor_link && components.actuator_link && camera_ok;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        state: state.shared.state().to_string(),
        kill_switch: state.shared.is_killed(),
        components: ComponentStatus {
            sensor_link: ComponentHealth::from_available(components.sensor_link),
            actuator_link: ComponentHealth::from_available(components.actuator_link),
            camera: ComponentHealth {
                source: Some(components.camera.to_string()),
                ..ComponentHealth::from_available(camera_ok)
            },
            detector: ComponentHealth::from_available(components.detector),
        },
    })
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsDisabled)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use camera_capture::VideoFrame;
    use command_gateway::DriveCommand;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use telemetry_link::DistanceReading;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tower::ServiceExt;
    use vehicle_state::VehicleState;

    struct Console {
        router: Router,
        shared: Arc<SharedVehicleState>,
        gateway: Arc<Mutex<CommandGateway>>,
        actuator: DuplexStream,
    }

    impl Console {
        fn new() -> Self {
            let (link, actuator) = tokio::io::duplex(64);
            let shared = Arc::new(SharedVehicleState::new());
            let gateway = Arc::new(Mutex::new(CommandGateway::new(link)));
            let state = AppState::new(shared.clone(), gateway.clone()).with_components(Components {
                sensor_link: true,
                actuator_link: true,
                camera: "synthetic",
                detector: false,
            });
            Self {
                router: create_router(Arc::new(state)),
                shared,
                gateway,
                actuator,
            }
        }

        async fn call(&self, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
            let mut request = Request::builder().method(method).uri(uri);
            let body = match body {
                Some(json) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .router
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, bytes.to_vec())
        }

        async fn json(&self, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
            let (status, bytes) = self.call(method, uri, body).await;
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    #[tokio::test]
    async fn test_telemetry_defaults() {
        let console = Console::new();

        let (status, body) = console.json("GET", "/api/v1/telemetry", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"state": "IDLE", "distance": 100}));
    }

    #[tokio::test]
    async fn test_telemetry_reflects_shared_state() {
        let console = Console::new();
        console.shared.set_distance(DistanceReading::from_cm(18));
        console.shared.set_state(VehicleState::ReversingFromProximity);

        let (_, body) = console.json("GET", "/api/v1/telemetry", None).await;

        assert_eq!(body["state"], "TOO CLOSE: Reversing");
        assert_eq!(body["distance"], 18);
    }

    #[tokio::test]
    async fn test_kill_stops_immediately() {
        let mut console = Console::new();
        console.gateway.lock().await.send(DriveCommand::Forward).await;

        let (status, body) = console.json("POST", "/api/v1/kill", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "STOPPED"}));
        assert!(console.shared.is_killed());

        let mut written = [0u8; 8];
        let n = console.actuator.read(&mut written).await.unwrap();
        assert_eq!(&written[..n], b"FS");

        let (_, body) = console.json("GET", "/api/v1/telemetry", None).await;
        assert_eq!(body["state"], "KILL SWITCH ACTIVATED");
    }

    #[tokio::test]
    async fn test_kill_rewrites_stop_when_already_stopped() {
        let mut console = Console::new();
        console.gateway.lock().await.send(DriveCommand::Stop).await;

        console.json("POST", "/api/v1/kill", None).await;
        console.json("POST", "/api/v1/kill", None).await;

        let mut written = [0u8; 8];
        let n = console.actuator.read(&mut written).await.unwrap();
        assert_eq!(&written[..n], b"SSS");
    }

    #[tokio::test]
    async fn test_reset_releases_kill() {
        let console = Console::new();
        console.shared.set_kill(true);

        let (status, body) = console.json("POST", "/api/v1/reset", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "RESUMED"}));
        assert!(!console.shared.is_killed());
    }

    #[tokio::test]
    async fn test_manual_command() {
        let console = Console::new();

        let (status, body) = console
            .json("POST", "/api/v1/manual", Some(r#"{"command": "left"}"#))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "MANUAL: LEFT");
        let intent = console.shared.manual_intent();
        assert!(intent.active);
        assert_eq!(intent.command, DriveCommand::Left);
        assert_eq!(console.shared.state(), VehicleState::ManualLeft);
    }

    #[tokio::test]
    async fn test_unknown_manual_command_rejected() {
        let console = Console::new();

        let (status, body) = console
            .json("POST", "/api/v1/manual", Some(r#"{"command": "sideways"}"#))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("sideways"));
        assert!(!console.shared.manual_intent().active);
        assert_eq!(console.shared.state(), VehicleState::Idle);
    }

    #[tokio::test]
    async fn test_resume_leaves_manual_mode() {
        let console = Console::new();
        console.shared.set_manual(DriveCommand::Backward);

        let (status, body) = console.json("POST", "/api/v1/resume", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "AUTONOMOUS"}));
        assert!(!console.shared.manual_intent().active);
    }

    #[tokio::test]
    async fn test_frame_snapshot() {
        let console = Console::new();

        let (status, _) = console.call("GET", "/api/v1/frame", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        console.shared.publish_frame(VideoFrame::blank(32, 24));
        let (status, jpeg) = console.call("GET", "/api/v1/frame", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_health_reports_components() {
        let console = Console::new();

        let (status, body) = console.json("GET", "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["state"], "IDLE");
        assert_eq!(body["kill_switch"], false);
        assert_eq!(body["components"]["detector"]["status"], "absent");
        assert_eq!(body["components"]["camera"]["source"], "synthetic");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let console = Console::new();
        let (status, _) = console.call("GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(console.shared.clone(), console.gateway.clone())
            .with_metrics(Some(handle));
        let response = create_router(Arc::new(state))
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
