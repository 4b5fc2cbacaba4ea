//! Operator Control Routes

use axum::{extract::State, Json};
use command_gateway::DriveCommand;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use vehicle_state::VehicleState;

use crate::{ApiError, AppState};

/// Manual drive request
#[derive(Debug, Deserialize)]
pub struct ManualRequest {
    /// `forward`, `backward`, `left`, `right` or `stop`
    pub command: String,
}

/// Route acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: status.into(),
        })
    }
}

/// Engage the kill switch and stop the motors without waiting for the control loop
pub async fn kill(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    warn!("Kill switch activated by operator");
    state.shared.set_kill(true);
    state.shared.set_state(VehicleState::KillSwitchActive);
    state.gateway.lock().await.force_stop().await;
    StatusResponse::new("STOPPED")
}

/// Release the kill switch
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    info!("Kill switch reset by operator");
    state.shared.set_kill(false);
    StatusResponse::new("RESUMED")
}

/// Take manual control with the given direction
pub async fn manual(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ManualRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let command: DriveCommand = request
        .command
        .parse()
        .map_err(|_| ApiError::UnknownCommand(request.command.clone()))?;

    info!("Manual command {}", command);
    state.shared.set_manual(command);
    Ok(StatusResponse::new(VehicleState::manual(command).label()))
}

/// Hand control back to the autonomous loop
pub async fn resume(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.shared.resume_autonomy();
    StatusResponse::new("AUTONOMOUS")
}
