//! Telemetry Routes

use axum::{extract::State, http::header, response::IntoResponse, Json};
use std::sync::Arc;
use vehicle_state::TelemetrySnapshot;

use crate::{ApiError, AppState};

/// Current mode label and distance
pub async fn get_telemetry(State(state): State<Arc<AppState>>) -> Json<TelemetrySnapshot> {
    Json(state.shared.snapshot())
}

/// Latest annotated frame as a JPEG
pub async fn get_frame(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let frame = state.shared.latest_frame().ok_or(ApiError::NoFrame)?;
    let quality = state.jpeg_quality;

    let jpeg = tokio::task::spawn_blocking(move || frame.encode_jpeg(quality))
        .await
        .map_err(|e| ApiError::Encode(e.to_string()))?
        .map_err(|e| ApiError::Encode(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg))
}
