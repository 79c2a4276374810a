//! Home Assistant implementation of `HostPlatform`

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::HassError;
use crate::rest::RestApi;
use crate::traits::HostPlatform;
use crate::types::{EntityState, RegistryEntry, ServiceCall};
use crate::ws;

/// Connection settings for a Home Assistant instance
#[derive(Debug, Clone)]
pub struct HassConnection {
    /// Base URL, e.g. `http://homeassistant.local:8123`
    pub url: String,
    /// Long-lived access token
    pub token: String,
    /// Timeout for state reads and writes
    pub request_timeout: Duration,
    /// Timeout for blocking service calls such as installs
    pub service_timeout: Duration,
}

/// `HostPlatform` backed by the Home Assistant REST and WebSocket APIs
///
/// States go over REST; the registry and service calls go over WebSocket.
#[derive(Debug, Clone)]
pub struct HassClient {
    rest: RestApi,
    ws_url: Url,
    token: String,
    service_timeout: Duration,
}

impl HassClient {
    /// Create a client for the given instance
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(connection: &HassConnection) -> Result<Self, HassError> {
        let mut base = connection.url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let ws_url = ws::websocket_url(&base_url)?;
        let rest = RestApi::new(
            base_url,
            connection.token.clone(),
            connection.request_timeout,
        )?;

        Ok(Self {
            rest,
            ws_url,
            token: connection.token.clone(),
            service_timeout: connection.service_timeout,
        })
    }

    #[must_use]
    pub fn websocket_url(&self) -> &Url {
        &self.ws_url
    }
}

#[async_trait]
impl HostPlatform for HassClient {
    async fn entity_registry(&self) -> Result<Vec<RegistryEntry>, HassError> {
        ws::fetch_entity_registry(&self.ws_url, &self.token).await
    }

    async fn state(&self, entity_id: &str) -> Result<Option<EntityState>, HassError> {
        self.rest.get_state(entity_id).await
    }

    async fn call_service(&self, call: &ServiceCall) -> Result<(), HassError> {
        tokio::time::timeout(
            self.service_timeout,
            ws::call_service(&self.ws_url, &self.token, call),
        )
        .await
        .map_err(|_| HassError::Timeout)?
    }

    async fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Value,
    ) -> Result<(), HassError> {
        self.rest.set_state(entity_id, state, attributes).await
    }

    fn platform_type(&self) -> &'static str {
        "homeassistant"
    }
}
