//! WebSocket client for the smartupd event stream

use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use smartupd_api::events::UpdaterEvent;

use crate::error::{ClientError, Result};

type EventStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Event stream URL for a daemon base URL
///
/// `http://host:8124` becomes `ws://host:8124/ws/events`, `https` maps to `wss`.
///
/// # Errors
/// Returns an error if the URL is invalid or uses another scheme.
pub fn events_url(base_url: impl AsRef<str>) -> Result<Url> {
    let mut url = Url::parse(base_url.as_ref())?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::WebSocket(format!(
                "unsupported scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ClientError::WebSocket(format!("cannot use scheme {scheme}")))?;
    Ok(url.join("/ws/events")?)
}

/// WebSocket client for receiving live events from the smartupd daemon
#[derive(Debug)]
pub struct WsClient {
    url: Url,
    receiver: mpsc::Receiver<UpdaterEvent>,
    _task_handle: tokio::task::JoinHandle<()>,
}

impl WsClient {
    /// Connect to the WebSocket endpoint
    ///
    /// Reconnects with exponential backoff when the daemon goes away; the
    /// backoff resets after every successful connect.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use smartupd_client::WsClient;
    /// use smartupd_api::events::UpdaterEvent;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut client = WsClient::connect("ws://localhost:8124/ws/events").await?;
    ///
    /// while let Some(event) = client.recv().await {
    ///     if let UpdaterEvent::UpdateApplied { record, .. } = event {
    ///         println!("{}: {} -> {}", record.name, record.old_version, record.new_version);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::unused_async)]
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        let (tx, rx) = mpsc::channel(100);

        let task_url = url.clone();
        let task_handle = tokio::spawn(async move {
            Self::connection_loop(task_url, tx).await;
        });

        Ok(Self {
            url,
            receiver: rx,
            _task_handle: task_handle,
        })
    }

    /// URL the client is connected to
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Receive the next event from the stream
    ///
    /// Returns `None` once the connection task has stopped.
    pub async fn recv(&mut self) -> Option<UpdaterEvent> {
        self.receiver.recv().await
    }

    async fn connection_loop(url: Url, tx: mpsc::Sender<UpdaterEvent>) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    tracing::info!(url = %url, "event stream connected");
                    backoff = INITIAL_BACKOFF;
                    match Self::forward(stream, &tx).await {
                        Ok(()) => {
                            tracing::debug!("event receiver dropped");
                            return;
                        }
                        Err(e) => tracing::warn!(error = %e, "event stream lost"),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        retry = ?backoff,
                        "event stream connect failed"
                    );
                }
            }

            sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Forward events until the stream ends; `Ok` means the receiver is gone
    async fn forward(mut stream: EventStream, tx: &mpsc::Sender<UpdaterEvent>) -> Result<()> {
        while let Some(msg) = stream.next().await {
            let msg = msg.map_err(|e| ClientError::WebSocket(e.to_string()))?;

            match msg {
                Message::Text(text) => {
                    let Some(event) = decode_event(&text) else {
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
                Message::Close(_) => {
                    return Err(ClientError::ConnectionClosed(
                        "daemon closed the event stream".into(),
                    ));
                }
                // Ping/pong answered by tungstenite
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }

        Err(ClientError::ConnectionClosed("stream ended".into()))
    }
}

fn decode_event(text: &str) -> Option<UpdaterEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "skipping unknown event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_url_from_http() {
        let url = events_url("http://localhost:8124").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8124/ws/events");
    }

    #[test]
    fn test_events_url_from_https() {
        let url = events_url("https://updates.example.com/").unwrap();
        assert_eq!(url.as_str(), "wss://updates.example.com/ws/events");
    }

    #[test]
    fn test_events_url_rejects_other_schemes() {
        assert!(events_url("ftp://example.com").is_err());
        assert!(events_url("not a url").is_err());
    }

    #[test]
    fn test_decode_known_event() {
        let event = decode_event(r#"{"type":"SnapshotRefreshed","count":3}"#).unwrap();
        assert!(matches!(event, UpdaterEvent::SnapshotRefreshed { count: 3 }));

        let event = decode_event(r#"{"type":"IntegrationReloaded"}"#).unwrap();
        assert!(matches!(event, UpdaterEvent::IntegrationReloaded));
    }

    #[test]
    fn test_decode_unknown_event() {
        assert!(decode_event(r#"{"type":"Nope"}"#).is_none());
        assert!(decode_event("garbage").is_none());
    }
}
