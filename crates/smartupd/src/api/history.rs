//! Update history endpoint

use std::sync::Arc;

use axum::{Json, extract::State};
use smartupd_api::responses::HistoryResponse;
use smartupd_core::GetHistory;

use crate::api::error::{ApiError, AppError};
use crate::state::AppState;

/// Applied updates, newest first
///
/// # Errors
/// Returns 503 while the integration is reloading
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "history",
    responses(
        (status = 200, description = "Newest-first update history", body = HistoryResponse),
        (status = 503, description = "Integration not set up", body = ApiError)
    )
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistoryResponse>, AppError> {
    let records = state
        .updater()?
        .ask(GetHistory)
        .await
        .map_err(|e| AppError::unavailable(format!("failed to read history: {e}")))?;

    Ok(Json(HistoryResponse { records }))
}
