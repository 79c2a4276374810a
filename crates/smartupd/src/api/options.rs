//! Options endpoints

use std::sync::Arc;

use axum::{Json, extract::State};
use smartupd_api::requests::OptionsRequest;
use smartupd_api::responses::OptionsResponse;

use crate::api::error::{ApiError, AppError};
use crate::state::AppState;

/// Options the integration runs with
#[utoipa::path(
    get,
    path = "/api/options",
    tag = "options",
    responses((status = 200, description = "Current options", body = OptionsResponse))
)]
pub async fn get_options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    Json(state.entry.options().to_response())
}

/// Save options; a change reloads the integration
///
/// # Errors
/// Returns 400 for an invalid time or entity id
#[utoipa::path(
    put,
    path = "/api/options",
    tag = "options",
    request_body = OptionsRequest,
    responses(
        (status = 200, description = "Saved options", body = OptionsResponse),
        (status = 400, description = "Invalid options", body = ApiError)
    )
)]
pub async fn put_options(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptionsRequest>,
) -> Result<Json<OptionsResponse>, AppError> {
    let saved = state.entry.update(req).await?;
    Ok(Json(saved.to_response()))
}
