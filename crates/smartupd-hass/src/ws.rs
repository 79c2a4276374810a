//! Home Assistant WebSocket API
//!
//! The entity registry is only exposed over the WebSocket API, and service
//! calls only block until completion here. Each request opens a short-lived
//! connection, authenticates, issues one command and closes again.

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

use crate::error::HassError;
use crate::types::{RegistryEntry, ServiceCall};

type Stream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const REGISTRY_LIST: &str = "config/entity_registry/list";
const CALL_SERVICE: &str = "call_service";

/// One frame of the WebSocket protocol
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<FrameError>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FrameError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Derive `ws(s)://host/api/websocket` from the REST base URL
///
/// # Errors
/// Returns an error for schemes other than http/https.
pub fn websocket_url(base_url: &Url) -> Result<Url, HassError> {
    let scheme = match base_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(HassError::Url(format!("unsupported scheme: {other}"))),
    };
    let mut url = base_url.join("api/websocket")?;
    url.set_scheme(scheme)
        .map_err(|()| HassError::Url(format!("cannot switch {base_url} to {scheme}")))?;
    Ok(url)
}

/// Fetch the full entity registry
///
/// # Errors
/// Returns `Auth` if the token is rejected, `WebSocket` on transport
/// failures and `InvalidResponse` if the host answers out of protocol.
pub async fn fetch_entity_registry(
    ws_url: &Url,
    token: &str,
) -> Result<Vec<RegistryEntry>, HassError> {
    let mut stream = open(ws_url, token).await?;
    let frame = command(&mut stream, json!({ "id": 1, "type": REGISTRY_LIST })).await;
    stream.close(None).await.ok();
    parse_registry_result(frame?)
}

/// Call a service and wait until the host finished it
///
/// The `call_service` command blocks on the host until the service returns.
/// The REST endpoint stops waiting after a few seconds and answers 200 either
/// way, which would make long installs look finished.
///
/// # Errors
/// Returns `ServiceFailed` if the host reports an error for the call.
pub async fn call_service(ws_url: &Url, token: &str, call: &ServiceCall) -> Result<(), HassError> {
    let mut stream = open(ws_url, token).await?;
    debug!(domain = %call.domain, service = %call.service, "calling host service");

    let payload = json!({
        "id": 1,
        "type": CALL_SERVICE,
        "domain": call.domain,
        "service": call.service,
        "service_data": call.data,
    });
    let frame = command(&mut stream, payload).await;
    stream.close(None).await.ok();

    command_result(frame?)
        .map(|_| ())
        .map_err(|message| HassError::ServiceFailed {
            domain: call.domain.clone(),
            service: call.service.clone(),
            message,
        })
}

/// Connect and authenticate
async fn open(ws_url: &Url, token: &str) -> Result<Stream, HassError> {
    let (mut stream, _) = connect_async(ws_url.as_str()).await?;
    debug!(url = %ws_url, "WebSocket connected");
    authenticate(&mut stream, token).await?;
    Ok(stream)
}

/// Send one command and wait for its result frame
async fn command(stream: &mut Stream, payload: Value) -> Result<Frame, HassError> {
    let id = payload.get("id").and_then(Value::as_u64);
    send_json(stream, &payload).await?;
    loop {
        let frame = next_frame(stream).await?;
        if frame.kind == "result" && frame.id == id {
            return Ok(frame);
        }
    }
}

/// Run the `auth_required` / `auth` / `auth_ok` handshake
async fn authenticate(stream: &mut Stream, token: &str) -> Result<(), HassError> {
    let hello = next_frame(stream).await?;
    if hello.kind != "auth_required" {
        return Err(HassError::InvalidResponse(format!(
            "expected auth_required, got {}",
            hello.kind
        )));
    }

    send_json(stream, &json!({ "type": "auth", "access_token": token })).await?;

    let reply = next_frame(stream).await?;
    match reply.kind.as_str() {
        "auth_ok" => Ok(()),
        "auth_invalid" => Err(HassError::Auth(
            reply.message.unwrap_or_else(|| "invalid access token".to_string()),
        )),
        other => Err(HassError::InvalidResponse(format!(
            "unexpected auth reply: {other}"
        ))),
    }
}

async fn send_json(stream: &mut Stream, value: &Value) -> Result<(), HassError> {
    stream.send(Message::Text(value.to_string().into())).await?;
    Ok(())
}

/// Read the next text frame, skipping control frames
async fn next_frame(stream: &mut Stream) -> Result<Frame, HassError> {
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            Message::Close(_) => {
                return Err(HassError::WebSocket("server closed connection".into()));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
        }
    }
    Err(HassError::WebSocket("stream ended".into()))
}

/// Payload of a result frame, or the host's error as `code: message`
fn command_result(frame: Frame) -> Result<Option<Value>, String> {
    if frame.success != Some(true) {
        return Err(frame.error.map_or_else(
            || "command failed".to_string(),
            |e| format!("{}: {}", e.code, e.message),
        ));
    }
    Ok(frame.result)
}

fn parse_registry_result(frame: Frame) -> Result<Vec<RegistryEntry>, HassError> {
    let result = command_result(frame)
        .map_err(HassError::InvalidResponse)?
        .ok_or_else(|| HassError::InvalidResponse("result frame without payload".into()))?;
    Ok(serde_json::from_value(result)?)
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;

    type Reply = fn(&Value) -> Value;

    /// One-connection host: handshake, then answer the first command
    async fn serve_once(reply: Reply) -> (Url, tokio::task::JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = Url::parse(&format!("ws://{addr}/api/websocket")).unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            let text = |v: Value| Message::Text(v.to_string().into());

            ws.send(text(json!({"type": "auth_required"}))).await.unwrap();
            let Some(Ok(Message::Text(auth))) = ws.next().await else {
                panic!("expected auth message");
            };
            let auth: Value = serde_json::from_str(auth.as_str()).unwrap();
            assert_eq!(auth["access_token"], "token");
            ws.send(text(json!({"type": "auth_ok"}))).await.unwrap();

            let Some(Ok(Message::Text(cmd))) = ws.next().await else {
                panic!("expected command");
            };
            let cmd: Value = serde_json::from_str(cmd.as_str()).unwrap();
            // Unrelated frame ahead of the result
            ws.send(text(json!({"id": 7, "type": "event", "event": {}})))
                .await
                .unwrap();
            ws.send(text(reply(&cmd))).await.unwrap();
            cmd
        });
        (url, server)
    }

    #[tokio::test]
    async fn test_call_service_waits_for_result() {
        let (url, server) = serve_once(|cmd| {
            json!({"id": cmd["id"], "type": "result", "success": true, "result": {"context": {}}})
        })
        .await;

        let call = ServiceCall::install_update("update.mushroom_update");
        call_service(&url, "token", &call).await.unwrap();

        let cmd = server.await.unwrap();
        assert_eq!(cmd["type"], "call_service");
        assert_eq!(cmd["domain"], "update");
        assert_eq!(cmd["service"], "install");
        assert_eq!(cmd["service_data"]["entity_id"], "update.mushroom_update");
    }

    #[tokio::test]
    async fn test_call_service_reports_host_error() {
        let (url, server) = serve_once(|cmd| {
            json!({"id": cmd["id"], "type": "result", "success": false,
                   "error": {"code": "home_assistant_error", "message": "download failed"}})
        })
        .await;

        let call = ServiceCall::install_update("update.card");
        let err = call_service(&url, "token", &call).await.unwrap_err();
        match err {
            HassError::ServiceFailed { message, .. } => {
                assert!(message.contains("download failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_registry_over_socket() {
        let (url, server) = serve_once(|cmd| {
            json!({"id": cmd["id"], "type": "result", "success": true,
                   "result": [{"entity_id": "update.card", "platform": "hacs"}]})
        })
        .await;

        let entries = fetch_entity_registry(&url, "token").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(server.await.unwrap()["type"], REGISTRY_LIST);
    }

    #[tokio::test]
    async fn test_wss_starts_tls_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut first = [0u8; 1];
            socket.read_exact(&mut first).await.unwrap();
            first[0]
        });

        let url = Url::parse(&format!("wss://{addr}/api/websocket")).unwrap();
        let err = fetch_entity_registry(&url, "token").await.unwrap_err();

        // 0x16 opens a TLS handshake record
        assert_eq!(server.await.unwrap(), 0x16);
        assert!(!err.to_string().contains("TLS support not compiled in"));
    }

    #[test]
    fn test_websocket_url_from_http() {
        let base = Url::parse("http://homeassistant.local:8123/").unwrap();
        let url = websocket_url(&base).unwrap();
        assert_eq!(url.as_str(), "ws://homeassistant.local:8123/api/websocket");
    }

    #[test]
    fn test_websocket_url_from_https() {
        let base = Url::parse("https://example.com/ha/").unwrap();
        let url = websocket_url(&base).unwrap();
        assert_eq!(url.as_str(), "wss://example.com/ha/api/websocket");
    }

    #[test]
    fn test_websocket_url_rejects_other_schemes() {
        let base = Url::parse("ftp://example.com/").unwrap();
        assert!(websocket_url(&base).is_err());
    }

    #[test]
    fn test_parse_registry_result() {
        let frame: Frame = serde_json::from_str(
            r#"{
                "id": 1,
                "type": "result",
                "success": true,
                "result": [
                    {"entity_id": "update.mushroom_update", "platform": "hacs", "name": null, "disabled_by": null, "icon": null},
                    {"entity_id": "light.kitchen", "platform": "hue", "disabled_by": "user"}
                ]
            }"#,
        )
        .unwrap();

        let entries = parse_registry_result(frame).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].platform, "hacs");
        assert_eq!(entries[0].domain(), "update");
        assert!(entries[1].is_disabled());
    }

    #[test]
    fn test_parse_registry_error() {
        let frame: Frame = serde_json::from_str(
            r#"{"id": 1, "type": "result", "success": false,
                "error": {"code": "unauthorized", "message": "Unauthorized"}}"#,
        )
        .unwrap();

        let err = parse_registry_result(frame).unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }
}
