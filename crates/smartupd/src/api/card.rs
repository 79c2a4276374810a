//! Companion card asset

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use tracing::warn;

use crate::api::error::AppError;
use crate::state::AppState;

/// URL the card is served under
pub const CARD_URL: &str = "/hacsfiles/smart_updater/smart-updater-card.js";

/// Serve the configured card script
///
/// # Errors
/// Returns 404 if no card is configured or the file cannot be read
pub async fn card(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let Some(path) = &state.card_path else {
        return Err(AppError::not_found("no card configured"));
    };
    let script = tokio::fs::read(path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "failed to read card script");
        AppError::not_found("card script not found")
    })?;

    Ok(([(header::CONTENT_TYPE, "application/javascript")], script))
}
