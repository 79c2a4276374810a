//! Application state shared across HTTP handlers

use std::path::PathBuf;
use std::sync::Arc;

use kameo::actor::ActorRef;
use smartupd_api::events::UpdaterEvent;
use smartupd_core::UpdaterActor;
use tokio::sync::{broadcast, watch};

use crate::api::error::AppError;
use crate::entry::ConfigEntry;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Updater of the running integration, `None` while reloading
    pub service: watch::Receiver<Option<ActorRef<UpdaterActor>>>,
    /// Config entry holding the options
    pub entry: Arc<ConfigEntry>,
    /// Event broadcast for WebSocket clients
    pub event_tx: broadcast::Sender<UpdaterEvent>,
    /// Companion card script, if configured
    pub card_path: Option<PathBuf>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        service: watch::Receiver<Option<ActorRef<UpdaterActor>>>,
        entry: Arc<ConfigEntry>,
        event_tx: broadcast::Sender<UpdaterEvent>,
        card_path: Option<PathBuf>,
    ) -> Self {
        Self {
            service,
            entry,
            event_tx,
            card_path,
        }
    }

    /// The live updater
    ///
    /// # Errors
    /// Returns 503 while the integration is not set up
    pub fn updater(&self) -> Result<ActorRef<UpdaterActor>, AppError> {
        self.service
            .borrow()
            .clone()
            .ok_or_else(|| AppError::unavailable("integration is not set up"))
    }
}
