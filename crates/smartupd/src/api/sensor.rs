//! Update sensor endpoints

use std::sync::Arc;

use axum::{Json, extract::State};
use smartupd_api::SensorSnapshot;
use smartupd_core::{CoreError, GetSnapshot, RefreshSnapshot};

use crate::api::error::{ApiError, AppError};
use crate::state::AppState;

/// Current list of pending updates
///
/// # Errors
/// Returns 503 before the first poll completed or while reloading
#[utoipa::path(
    get,
    path = "/api/sensor",
    tag = "sensor",
    responses(
        (status = 200, description = "Latest snapshot", body = SensorSnapshot),
        (status = 503, description = "No snapshot yet", body = ApiError)
    )
)]
pub async fn get_sensor(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SensorSnapshot>, AppError> {
    let snapshot = state
        .updater()?
        .ask(GetSnapshot)
        .await
        .map_err(|e| AppError::unavailable(format!("failed to read snapshot: {e}")))?;

    snapshot
        .map(Json)
        .ok_or_else(|| AppError::unavailable("no update snapshot yet"))
}

/// Run an aggregation cycle now
///
/// # Errors
/// Returns 502 if the host cannot be read
#[utoipa::path(
    post,
    path = "/api/sensor/refresh",
    tag = "sensor",
    responses(
        (status = 200, description = "Fresh snapshot", body = SensorSnapshot),
        (status = 502, description = "Host read failed", body = ApiError),
        (status = 503, description = "Integration not set up", body = ApiError)
    )
)]
pub async fn refresh_sensor(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SensorSnapshot>, AppError> {
    let snapshot = state
        .updater()?
        .ask(RefreshSnapshot)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(snapshot))
}
