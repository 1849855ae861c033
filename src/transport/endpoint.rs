//! Protocol Endpoint (C2)
//!
//! Fuses request/response correlation with per-method handler dispatch
//! (mirroring `airs_mcp::integration::router::MessageRouter`'s
//! registration/fallback shape) on top of a single [`Transport`].
//! `PassthroughContext` holds one endpoint per side of the proxy.
//!
//! Correlation here is the minimum the proxy needs: `request()` mints an
//! id, parks a oneshot sender for it, and sends; `handle_message` pulls
//! the sender back out by id when the matching response arrives. There is
//! no separate manager, no background cleanup sweep, and no capacity
//! limit — a pending id outlives at most one in-flight request, and the
//! `tokio::time::timeout` in `request()` is what reclaims it if the peer
//! never answers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex, RwLock};

use crate::jsonrpc::{
    JsonRpcErrorObject, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};

use super::mcp::{MessageContext, MessageHandler, Transport, TransportError};

/// How long [`ProtocolEndpoint::request`] waits for a reply when the
/// caller doesn't specify one.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure modes surfaced by [`ProtocolEndpoint`] operations.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The underlying transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No reply arrived before the timeout elapsed
    #[error("request {id} timed out after {after:?}")]
    Timeout {
        /// Id of the request that timed out
        id: RequestId,
        /// The timeout that elapsed
        after: Duration,
    },

    /// The reply channel for a pending request was dropped without a reply
    #[error("reply channel for request {id} was dropped")]
    ChannelClosed {
        /// Id of the request whose channel closed
        id: RequestId,
    },

    /// The peer returned a JSON-RPC error object
    #[error("remote error {code}: {message}")]
    Remote {
        /// JSON-RPC error code
        code: i32,
        /// Error message
        message: String,
    },
}

/// Handles one named request method.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Produce the response for `request` (the id is copied onto it by the caller)
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse;
}

/// Handles one named notification method.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Observe a notification; notifications never produce a reply
    async fn handle_notification(&self, notification: JsonRpcNotification);
}

struct EndpointInner<T: Transport> {
    pending: DashMap<RequestId, oneshot::Sender<serde_json::Value>>,
    next_id: AtomicI64,
    transport: Arc<Mutex<T>>,
    request_handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
    notification_handlers: RwLock<HashMap<String, Arc<dyn NotificationHandler>>>,
    fallback_request_handler: RwLock<Option<Arc<dyn RequestHandler>>>,
    fallback_notification_handler: RwLock<Option<Arc<dyn NotificationHandler>>>,
    on_close: RwLock<Option<Arc<dyn Fn() + Send + Sync>>>,
    on_error: RwLock<Option<Arc<dyn Fn(TransportError) + Send + Sync>>>,
}

/// One side of a [`crate::context::PassthroughContext`]: owns a transport,
/// correlates outbound requests with their replies, and dispatches inbound
/// requests/notifications to registered handlers.
pub struct ProtocolEndpoint<T: Transport<Error = TransportError>> {
    inner: Arc<EndpointInner<T>>,
}

impl<T: Transport<Error = TransportError>> Clone for ProtocolEndpoint<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport<Error = TransportError> + 'static> ProtocolEndpoint<T> {
    /// Build an endpoint around `transport`, with its own pending-request table.
    pub async fn new(transport: T) -> Result<Self, EndpointError> {
        Ok(Self {
            inner: Arc::new(EndpointInner {
                pending: DashMap::new(),
                next_id: AtomicI64::new(1),
                transport: Arc::new(Mutex::new(transport)),
                request_handlers: RwLock::new(HashMap::new()),
                notification_handlers: RwLock::new(HashMap::new()),
                fallback_request_handler: RwLock::new(None),
                fallback_notification_handler: RwLock::new(None),
                on_close: RwLock::new(None),
                on_error: RwLock::new(None),
            }),
        })
    }

    /// Start the transport and install this endpoint as its message handler.
    pub async fn connect(&self) -> Result<(), EndpointError> {
        let handler: Arc<dyn MessageHandler> = Arc::new(self.clone());
        let mut transport = self.inner.transport.lock().await;
        transport.set_message_handler(handler);
        transport.start().await.map_err(EndpointError::Transport)
    }

    /// Send `method`/`params` and await the correlated reply, or
    /// [`EndpointError::Timeout`] if `timeout` (default 30s) elapses first.
    pub async fn request(
        &self,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<JsonRpcResponse, EndpointError> {
        let method = method.into();
        let timeout = timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let id = RequestId::new_number(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let (sender, receiver) = oneshot::channel();
        self.inner.pending.insert(id.clone(), sender);

        let request = JsonRpcRequest::new(method, params, id.clone());
        {
            let mut transport = self.inner.transport.lock().await;
            if let Err(err) = transport.send(JsonRpcMessage::Request(request)).await {
                self.inner.pending.remove(&id);
                return Err(EndpointError::Transport(err));
            }
        }

        let result = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => return Err(EndpointError::ChannelClosed { id }),
            Err(_) => {
                self.inner.pending.remove(&id);
                return Err(EndpointError::Timeout { id, after: timeout });
            }
        };

        if let Some(error) = result.get("err") {
            return Err(EndpointError::Remote {
                code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(-32603) as i32,
                message: error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let value = result.get("ok").cloned().unwrap_or(serde_json::Value::Null);
        Ok(JsonRpcResponse::success(value, id))
    }

    /// Send a notification; no reply is expected.
    pub async fn notification(&self, notification: JsonRpcNotification) -> Result<(), EndpointError> {
        let mut transport = self.inner.transport.lock().await;
        transport
            .send(JsonRpcMessage::Notification(notification))
            .await
            .map_err(EndpointError::Transport)
    }

    /// Register the handler invoked for requests with this method name.
    pub async fn set_request_handler(&self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.inner
            .request_handlers
            .write()
            .await
            .insert(method.into(), handler);
    }

    /// Register the handler invoked for notifications with this method name.
    pub async fn set_notification_handler(
        &self,
        method: impl Into<String>,
        handler: Arc<dyn NotificationHandler>,
    ) {
        self.inner
            .notification_handlers
            .write()
            .await
            .insert(method.into(), handler);
    }

    /// Remove a previously registered request handler.
    pub async fn remove_request_handler(&self, method: &str) -> bool {
        self.inner.request_handlers.write().await.remove(method).is_some()
    }

    /// Handler invoked for a request whose method has no specific registration.
    pub async fn fallback_request_handler(&self, handler: Arc<dyn RequestHandler>) {
        *self.inner.fallback_request_handler.write().await = Some(handler);
    }

    /// Handler invoked for a notification whose method has no specific registration.
    pub async fn fallback_notification_handler(&self, handler: Arc<dyn NotificationHandler>) {
        *self.inner.fallback_notification_handler.write().await = Some(handler);
    }

    /// Callback invoked once the transport reports closure.
    pub async fn on_close(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        *self.inner.on_close.write().await = Some(callback);
    }

    /// Callback invoked for every transport-level error.
    pub async fn on_error(&self, callback: Arc<dyn Fn(TransportError) + Send + Sync>) {
        *self.inner.on_error.write().await = Some(callback);
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<(), EndpointError> {
        self.inner
            .transport
            .lock()
            .await
            .close()
            .await
            .map_err(EndpointError::Transport)
    }

    /// Send a message the peer did not ask for a reply to (e.g. a
    /// target-initiated request forwarded by `PassthroughContext`).
    pub async fn send_raw(&self, message: JsonRpcMessage) -> Result<(), EndpointError> {
        self.inner
            .transport
            .lock()
            .await
            .send(message)
            .await
            .map_err(EndpointError::Transport)
    }

    async fn dispatch_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let handler = self
            .inner
            .request_handlers
            .read()
            .await
            .get(&request.method)
            .cloned();

        let handler = match handler {
            Some(h) => Some(h),
            None => self.inner.fallback_request_handler.read().await.clone(),
        };

        match handler {
            Some(handler) => Some(handler.handle_request(request).await),
            None => Some(JsonRpcResponse::error(
                JsonRpcErrorObject::new(-32601, format!("method '{}' not found", request.method)),
                Some(request.id),
            )),
        }
    }

    async fn dispatch_notification(&self, notification: JsonRpcNotification) {
        let handler = self
            .inner
            .notification_handlers
            .read()
            .await
            .get(&notification.method)
            .cloned();

        let handler = match handler {
            Some(h) => Some(h),
            None => self.inner.fallback_notification_handler.read().await.clone(),
        };

        if let Some(handler) = handler {
            handler.handle_notification(notification).await;
        }
    }
}

/// The endpoint facing the MCP client. Thin newtype over [`ProtocolEndpoint`]
/// so the type system rejects plugging a client-facing endpoint in where a
/// [`ClientEndpoint`] belongs, and vice versa.
pub struct ServerEndpoint<T: Transport<Error = TransportError>>(ProtocolEndpoint<T>);

impl<T: Transport<Error = TransportError>> Clone for ServerEndpoint<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Transport<Error = TransportError> + 'static> ServerEndpoint<T> {
    /// Wrap an endpoint as the server-facing side of a `PassthroughContext`.
    pub async fn new(transport: T) -> Result<Self, EndpointError> {
        Ok(Self(ProtocolEndpoint::new(transport).await?))
    }
}

impl<T: Transport<Error = TransportError>> std::ops::Deref for ServerEndpoint<T> {
    type Target = ProtocolEndpoint<T>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The endpoint facing the target MCP server. Thin newtype over
/// [`ProtocolEndpoint`]; see [`ServerEndpoint`].
pub struct ClientEndpoint<T: Transport<Error = TransportError>>(ProtocolEndpoint<T>);

impl<T: Transport<Error = TransportError>> Clone for ClientEndpoint<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Transport<Error = TransportError> + 'static> ClientEndpoint<T> {
    /// Wrap an endpoint as the target-facing side of a `PassthroughContext`.
    pub async fn new(transport: T) -> Result<Self, EndpointError> {
        Ok(Self(ProtocolEndpoint::new(transport).await?))
    }
}

impl<T: Transport<Error = TransportError>> std::ops::Deref for ClientEndpoint<T> {
    type Target = ProtocolEndpoint<T>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: Transport<Error = TransportError> + 'static> MessageHandler for ProtocolEndpoint<T> {
    async fn handle_message(&self, message: JsonRpcMessage, _context: MessageContext) {
        match message {
            JsonRpcMessage::Response(response) => {
                if let Some(id) = response.id.clone() {
                    let result = if response.is_error() {
                        serde_json::json!({"err": response.error})
                    } else {
                        serde_json::json!({"ok": response.result.unwrap_or(serde_json::Value::Null)})
                    };
                    if let Some((_, sender)) = self.inner.pending.remove(&id) {
                        let _ = sender.send(result);
                    }
                }
            }
            JsonRpcMessage::Request(request) => {
                if let Some(response) = self.dispatch_request(request).await {
                    let _ = self.send_raw(JsonRpcMessage::Response(response)).await;
                }
            }
            JsonRpcMessage::Notification(notification) => {
                self.dispatch_notification(notification).await;
            }
        }
    }

    async fn handle_error(&self, error: TransportError) {
        if let Some(callback) = self.inner.on_error.read().await.as_ref() {
            callback(error);
        }
    }

    async fn handle_close(&self) {
        if let Some(callback) = self.inner.on_close.read().await.as_ref() {
            callback();
        }
    }
}
