//! HTTP client for the smartupd daemon

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use smartupd_api::{
    HistoryRecord, SensorSnapshot,
    requests::{EntityIdList, OptionsRequest, UpdateSelectedRequest},
    responses::{HealthResponse, HistoryResponse, OptionsResponse, UpdateSelectedResponse},
};

use crate::error::{ClientError, Result};

/// HTTP client for communicating with the smartupd daemon
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use smartupd_client::HttpClient;
    ///
    /// let client = HttpClient::new("http://localhost:8124")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new HTTP client with custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(base_url: impl AsRef<str>, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { client, base_url })
    }

    /// Build a full URL from a path
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ClientError::Url)
    }

    /// Turn a non-success response into `ClientError::Api`
    ///
    /// Uses the daemon's `{code, message}` body when present.
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(ClientError::Api { status, message })
    }

    /// Perform a GET request and deserialize the response
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Perform a POST request with JSON body
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl serde::Serialize,
    ) -> Result<T> {
        let url = self.url(path)?;
        let response = Self::check(self.client.post(url).json(&body).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Perform a PUT request with JSON body
    async fn put<T: DeserializeOwned>(&self, path: &str, body: impl serde::Serialize) -> Result<T> {
        let url = self.url(path)?;
        let response = Self::check(self.client.put(url).json(&body).send().await?).await?;
        Ok(response.json().await?)
    }

    // System endpoints

    /// Get daemon health status
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }

    // Sensor endpoints

    /// Latest update snapshot
    ///
    /// # Errors
    /// Returns `ClientError::Api` with status 503 before the first poll.
    ///
    /// # Example
    /// ```no_run
    /// # use smartupd_client::HttpClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = HttpClient::new("http://localhost:8124")?;
    /// let snapshot = client.sensor().await?;
    /// for update in &snapshot.updates {
    ///     println!("{}: {}", update.name, update.latest_version);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sensor(&self) -> Result<SensorSnapshot> {
        self.get("/api/sensor").await
    }

    /// Run an aggregation cycle now
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn refresh_sensor(&self) -> Result<SensorSnapshot> {
        self.post("/api/sensor/refresh", serde_json::json!({})).await
    }

    // History

    /// Applied updates, newest first
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        let response: HistoryResponse = self.get("/api/history").await?;
        Ok(response.records)
    }

    // Services

    /// Install updates for the given entities, in order
    ///
    /// Blocks until every install finished or one failed.
    ///
    /// # Errors
    /// Returns `ClientError::Api` with status 400 for invalid ids and 502 for
    /// a failed install.
    pub async fn update_selected<I, S>(&self, entity_ids: I) -> Result<UpdateSelectedResponse>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let body = UpdateSelectedRequest {
            entity_id: EntityIdList::List(entity_ids.into_iter().map(Into::into).collect()),
        };
        self.post("/api/services/update_selected", body).await
    }

    // Options

    /// Current options
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn options(&self) -> Result<OptionsResponse> {
        self.get("/api/options").await
    }

    /// Change options; a change reloads the integration
    ///
    /// # Example
    /// ```no_run
    /// # use smartupd_client::HttpClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = HttpClient::new("http://localhost:8124")?;
    /// client.set_options()
    ///     .time("04:00")
    ///     .entity("update.mushroom_update")
    ///     .auto_restart(true)
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn set_options(&self) -> OptionsBuilder {
        OptionsBuilder::new(self.clone())
    }
}

/// Builder for partial options updates
///
/// Fields that are never set keep their current value on the daemon.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    client: HttpClient,
    request: OptionsRequest,
}

impl OptionsBuilder {
    /// Create a new builder
    fn new(client: HttpClient) -> Self {
        Self {
            client,
            request: OptionsRequest::default(),
        }
    }

    /// Daily run time, `HH:MM` or `HH:MM:SS`
    #[must_use]
    pub fn time(mut self, time: impl Into<String>) -> Self {
        self.request.auto_update_time = Some(time.into());
        self
    }

    /// Add an entity to the auto-update list
    ///
    /// Replaces the daemon's list with the entities added here.
    #[must_use]
    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.request
            .auto_update_entities
            .get_or_insert_with(Vec::new)
            .push(entity_id.into());
        self
    }

    /// Replace the auto-update list, possibly with an empty one
    #[must_use]
    pub fn entities<I, S>(mut self, entity_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.auto_update_entities =
            Some(entity_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restart the host after automatic updates
    #[must_use]
    pub fn auto_restart(mut self, enabled: bool) -> Self {
        self.request.auto_restart = Some(enabled);
        self
    }

    /// The request body this builder sends
    #[must_use]
    pub fn request(&self) -> &OptionsRequest {
        &self.request
    }

    /// Send the request
    ///
    /// # Errors
    /// Returns `ClientError::Api` with status 400 for invalid options.
    pub async fn send(self) -> Result<OptionsResponse> {
        self.client.put("/api/options", &self.request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new("http://localhost:8124");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new("not a url");
        assert!(client.is_err());
    }

    #[test]
    fn test_url_building() {
        let client = HttpClient::new("http://localhost:8124").unwrap();
        let url = client.url("/api/services/update_selected").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8124/api/services/update_selected"
        );
    }

    #[test]
    fn test_options_builder_only_sets_touched_fields() {
        let client = HttpClient::new("http://localhost:8124").unwrap();
        let builder = client.set_options().auto_restart(true);

        let body = serde_json::to_value(builder.request()).unwrap();
        assert_eq!(body, serde_json::json!({"auto_restart": true}));
    }

    #[test]
    fn test_options_builder_collects_entities() {
        let client = HttpClient::new("http://localhost:8124").unwrap();
        let builder = client
            .set_options()
            .time("04:00")
            .entity("update.a")
            .entity("update.b");

        let request = builder.request();
        assert_eq!(request.auto_update_time.as_deref(), Some("04:00"));
        assert_eq!(
            request.auto_update_entities,
            Some(vec!["update.a".to_string(), "update.b".to_string()])
        );
        assert!(request.auto_restart.is_none());
    }

    #[test]
    fn test_clearing_entities() {
        let client = HttpClient::new("http://localhost:8124").unwrap();
        let builder = client.set_options().entities(Vec::<String>::new());
        assert_eq!(builder.request().auto_update_entities, Some(Vec::new()));
    }
}
