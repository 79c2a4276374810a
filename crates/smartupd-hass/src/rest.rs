//! Home Assistant REST API

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use url::Url;

use crate::error::HassError;
use crate::types::EntityState;

/// Thin wrapper over the `/api` REST endpoints
#[derive(Debug, Clone)]
pub struct RestApi {
    client: Client,
    base_url: Url,
    token: String,
}

impl RestApi {
    /// Create a REST API handle for state reads and writes
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, HassError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// Build a full URL from a path
    pub(crate) fn url(&self, path: &str) -> Result<Url, HassError> {
        Ok(self.base_url.join(path)?)
    }

    /// Map a non-success response to `HassError::Api`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, HassError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED.as_u16() {
            return Err(HassError::Auth(message));
        }
        Err(HassError::Api { status, message })
    }

    /// `GET /api/states/<entity_id>`
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-404 error status.
    pub async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, HassError> {
        let url = self.url(&format!("api/states/{entity_id}"))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response).await?;
        Ok(Some(response.json().await?))
    }

    /// `POST /api/states/<entity_id>`
    ///
    /// # Errors
    /// Returns an error on transport failure or an error status.
    pub async fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Value,
    ) -> Result<(), HassError> {
        let url = self.url(&format!("api/states/{entity_id}"))?;
        let body = json!({ "state": state, "attributes": attributes });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
