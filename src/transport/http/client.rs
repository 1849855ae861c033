//! HTTP target transport
//!
//! Speaks to the configured target MCP server: `POST` for client-initiated
//! requests/notifications, `GET` with `Accept: text/event-stream` for
//! target-initiated pushes. Two wire shapes are supported per
//! `TARGET_SERVER_TRANSPORT` — legacy SSE servers split the two directions
//! across `/sse` and `/messages`, modern streamable-HTTP servers use one
//! path for both — grounded on the dual-endpoint split in
//! `airs_mcp::transport::adapters::http::sse::transport::HttpSseTransport`
//! and the single-endpoint POST/receive cycle of
//! `airs_mcp::transport::adapters::http::client::HttpClientTransport`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::jsonrpc::JsonRpcMessage;

use super::super::mcp::{MessageContext, MessageHandler, ResponseType, Transport, TransportError};

/// Initial delay before the first SSE reconnect attempt.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Reconnect delay never grows past this.
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Multiplier applied to the backoff after each failed attempt.
const BACKOFF_GROWTH: f64 = 1.5;
/// Consecutive failed reconnects tolerated before giving up and closing.
const MAX_RETRIES: u32 = 2;

/// Which wire shape the target server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetTransportMode {
    /// Legacy dual-endpoint SSE: `GET {base}/sse`, `POST {base}/messages`.
    Sse,
    /// Modern streamable HTTP: one path for both directions.
    HttpStream,
}

/// HTTP transport to the target MCP server.
pub struct HttpClientTransport {
    client: Client,
    base_url: Url,
    mode: TargetTransportMode,
    auth_token: Option<String>,
    session_id: Option<String>,
    handler: Option<Arc<dyn MessageHandler>>,
    sse_task: Option<JoinHandle<()>>,
    connected: bool,
}

impl HttpClientTransport {
    /// Build a transport targeting `base_url` (the configured
    /// `TARGET_SERVER_URL` joined with `TARGET_SERVER_MCP_PATH`).
    pub fn new(base_url: Url, mode: TargetTransportMode, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            mode,
            auth_token,
            session_id: None,
            handler: None,
            sse_task: None,
            connected: false,
        }
    }

    fn send_url(&self) -> Url {
        match self.mode {
            TargetTransportMode::Sse => self
                .base_url
                .join("messages")
                .unwrap_or_else(|_| self.base_url.clone()),
            TargetTransportMode::HttpStream => self.base_url.clone(),
        }
    }

    fn receive_url(&self) -> Url {
        match self.mode {
            TargetTransportMode::Sse => self
                .base_url
                .join("sse")
                .unwrap_or_else(|_| self.base_url.clone()),
            TargetTransportMode::HttpStream => self.base_url.clone(),
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Split an SSE byte buffer on blank lines and dispatch each `data:` line.
async fn dispatch_sse_text(text: &str, handler: &Arc<dyn MessageHandler>) {
    for event in text.split("\n\n") {
        for line in event.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            match JsonRpcMessage::from_json(data) {
                Ok(message) => {
                    handler
                        .handle_message(message, MessageContext::now())
                        .await;
                }
                Err(err) => handler.handle_error(TransportError::from(err)).await,
            }
        }
    }
}

async fn stream_sse_body(
    response: reqwest::Response,
    handler: &Arc<dyn MessageHandler>,
) -> Result<(), TransportError> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| TransportError::connection(format!("SSE read failed: {err}")))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(pos) = buffer.find("\n\n") {
            let event: String = buffer.drain(..pos + 2).collect();
            dispatch_sse_text(&event, handler).await;
        }
    }
    Ok(())
}

async fn reconnecting_sse_loop(
    client: Client,
    url: Url,
    auth_token: Option<String>,
    handler: Arc<dyn MessageHandler>,
) {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0u32;

    loop {
        let mut builder = client.get(url.clone()).header(ACCEPT, "text/event-stream");
        if let Some(token) = &auth_token {
            builder = builder.bearer_auth(token);
        }

        match builder.send().await {
            Ok(response) if response.status().is_success() => {
                attempt = 0;
                backoff = INITIAL_BACKOFF;
                if let Err(err) = stream_sse_body(response, &handler).await {
                    warn!(%err, "target SSE stream ended with an error");
                    handler.handle_error(err).await;
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "target SSE endpoint returned non-success status");
                handler
                    .handle_error(TransportError::connection(format!(
                        "target SSE endpoint returned status {}",
                        response.status()
                    )))
                    .await;
            }
            Err(err) => {
                warn!(%err, "target SSE connect failed");
                handler
                    .handle_error(TransportError::connection(format!("target SSE connect failed: {err}")))
                    .await;
            }
        }

        attempt += 1;
        if attempt > MAX_RETRIES {
            handler.handle_close().await;
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = Duration::from_secs_f64((backoff.as_secs_f64() * BACKOFF_GROWTH).min(MAX_BACKOFF.as_secs_f64()));
    }
}

#[async_trait]
impl Transport for HttpClientTransport {
    type Error = TransportError;

    async fn start(&mut self) -> Result<(), Self::Error> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| TransportError::connection("no message handler set"))?;

        let url = self.receive_url();
        let client = self.client.clone();
        let auth_token = self.auth_token.clone();
        self.sse_task = Some(tokio::spawn(reconnecting_sse_loop(client, url, auth_token, handler)));
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if let Some(task) = self.sse_task.take() {
            task.abort();
        }
        self.connected = false;
        Ok(())
    }

    async fn send(&mut self, message: JsonRpcMessage) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(TransportError::Closed);
        }

        let body = message.to_json()?;
        let mut builder = self
            .client
            .post(self.send_url())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .body(body);
        builder = self.apply_auth(builder);
        if let Some(session_id) = &self.session_id {
            builder = builder.header("Mcp-Session-Id", session_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::connection(format!("target request failed: {err}")))?;

        if let Some(session_id) = response
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let status = response.status();
        if status == reqwest::StatusCode::ACCEPTED {
            // Streamable-HTTP: the reply will arrive on the SSE channel.
            return Ok(());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = TransportError::target(
                status.as_u16() as i32,
                format!("target responded with status {status}"),
                Some(Value::String(body)),
                ResponseType::Http,
            );
            if let Some(handler) = &self.handler {
                handler.handle_error(error.clone()).await;
            }
            return Err(error);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::connection(format!("reading target response failed: {err}")))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if let Some(handler) = &self.handler {
            if content_type.starts_with("text/event-stream") {
                dispatch_sse_text(&text, handler).await;
            } else if !text.trim().is_empty() {
                let message = JsonRpcMessage::from_json(text.trim())?;
                handler
                    .handle_message(message, MessageContext::now())
                    .await;
            }
        }

        Ok(())
    }

    fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        self.handler = Some(handler);
    }
}
