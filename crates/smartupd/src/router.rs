//! HTTP router configuration

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use smartupd_api::events::UpdaterEvent;
use smartupd_api::requests::{EntityIdList, OptionsRequest, UpdateSelectedRequest};
use smartupd_api::responses::{
    HealthResponse, HistoryResponse, OptionsResponse, UpdateSelectedResponse,
};
use smartupd_api::{HistoryRecord, SensorSnapshot, UpdateCandidate};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::{self, ApiError, card, history, options, sensor, services, system};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "smartupd", description = "Home Assistant update tracker"),
    paths(
        system::health,
        services::update_selected,
        sensor::get_sensor,
        sensor::refresh_sensor,
        history::get_history,
        options::get_options,
        options::put_options,
    ),
    components(schemas(
        ApiError,
        EntityIdList,
        HealthResponse,
        HistoryRecord,
        HistoryResponse,
        OptionsRequest,
        OptionsResponse,
        SensorSnapshot,
        UpdateCandidate,
        UpdateSelectedRequest,
        UpdateSelectedResponse,
        UpdaterEvent,
    ))
)]
pub struct ApiDoc;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // System endpoints
        .route("/health", get(system::health))
        // Services
        .route(
            "/api/services/update_selected",
            post(services::update_selected),
        )
        // Sensor
        .route("/api/sensor", get(sensor::get_sensor))
        .route("/api/sensor/refresh", post(sensor::refresh_sensor))
        // History
        .route("/api/history", get(history::get_history))
        // Options
        .route(
            "/api/options",
            get(options::get_options).put(options::put_options),
        )
        // Events
        .route("/ws/events", get(api::ws::events))
        // Card asset
        .route(card::CARD_URL, get(card::card))
        // Docs
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .with_state(state)
}
