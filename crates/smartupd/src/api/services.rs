//! Integration services

use std::sync::Arc;

use axum::{Json, extract::State};
use smartupd_api::requests::UpdateSelectedRequest;
use smartupd_api::responses::UpdateSelectedResponse;
use smartupd_core::{CoreError, UpdateSelected};
use smartupd_hass::valid_entity_id;
use tracing::info;

use crate::api::error::{ApiError, AppError};
use crate::state::AppState;

/// Install updates for the given entities, one after another
///
/// Entities unknown to the host are skipped. The first failing install stops
/// the remaining ones.
///
/// # Errors
/// Returns 400 for a missing or malformed entity id, 502 if an install fails
#[utoipa::path(
    post,
    path = "/api/services/update_selected",
    tag = "services",
    request_body = UpdateSelectedRequest,
    responses(
        (status = 200, description = "All installs finished", body = UpdateSelectedResponse),
        (status = 400, description = "Invalid entity ids", body = ApiError),
        (status = 502, description = "An install failed", body = ApiError),
        (status = 503, description = "Integration not set up", body = ApiError)
    )
)]
pub async fn update_selected(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateSelectedRequest>,
) -> Result<Json<UpdateSelectedResponse>, AppError> {
    let entity_ids = parse_entity_ids(req)?;
    let updater = state.updater()?;

    info!(entities = ?entity_ids, "update_selected called");
    let report = updater
        .ask(UpdateSelected {
            entity_ids: entity_ids.clone(),
        })
        .await
        .map_err(CoreError::from)?;

    Ok(Json(UpdateSelectedResponse {
        requested: entity_ids,
        applied: report.applied(),
    }))
}

fn parse_entity_ids(req: UpdateSelectedRequest) -> Result<Vec<String>, AppError> {
    let ids = req.entity_id.into_ids();
    if ids.is_empty() {
        return Err(AppError::bad_request("entity_id is required"));
    }
    if let Some(bad) = ids.iter().find(|id| !valid_entity_id(id)) {
        return Err(AppError::bad_request(format!("invalid entity id: {bad}")));
    }
    Ok(ids)
}
