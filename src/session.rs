//! Session Manager (C7)
//!
//! Multiplexes many [`PassthroughContext`]s behind one HTTP listener, one
//! per `Mcp-Session-Id`. `initialize` with no session header mints a new
//! UUIDv4 session and wires a fresh [`SessionTransport`]/target pair through
//! it; every later POST on that id is dispatched straight to the existing
//! context. Grounded on the session-id-in-headers pattern in
//! `airs_mcp::transport::adapters::http::axum::handlers::extract_or_create_session`,
//! adapted from a side-channel lookup table to the sole dispatch path since
//! this proxy has no connection-level session concept of its own to fall
//! back on.

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::warn;
use uuid::Uuid;

use crate::context::{HookConfig, OtherRequestPolicy, PassthroughContext};
use crate::error::ProxyError;
use crate::jsonrpc::{methods, JsonRpcMessage, JsonRpcResponse, RequestId};
use crate::transport::mcp::{MessageContext, MessageHandler, Transport, TransportError};

/// The server-facing transport a [`SessionManager`] hands to each session's
/// [`PassthroughContext`]. Bridges the proxy's event-driven [`Transport`]
/// contract onto HTTP's request/response shape: a `send()` of a response
/// fulfills the oneshot the matching POST is waiting on; anything else
/// (a target-initiated request, a notification) goes out over the
/// session's SSE broadcast channel for the GET `/mcp` stream to pick up.
#[derive(Clone)]
pub struct SessionTransport {
    inner: Arc<SessionTransportInner>,
}

struct SessionTransportInner {
    handler: StdMutex<Option<Arc<dyn MessageHandler>>>,
    pending: DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>,
    outbound: broadcast::Sender<JsonRpcMessage>,
}

/// What a single dispatched POST body resolved to.
pub enum DispatchOutcome {
    /// A request: the caller should return this as the HTTP body.
    Response(JsonRpcResponse),
    /// A notification: the caller should return `202 Accepted` with no body.
    Accepted,
}

impl SessionTransport {
    fn new() -> Self {
        let (outbound, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(SessionTransportInner {
                handler: StdMutex::new(None),
                pending: DashMap::new(),
                outbound,
            }),
        }
    }

    /// Subscribe to this session's target-initiated/notification stream,
    /// for the GET `/mcp` SSE handler.
    pub fn subscribe(&self) -> broadcast::Receiver<JsonRpcMessage> {
        self.inner.outbound.subscribe()
    }

    /// Feed one HTTP POST body through the session's handler and wait for
    /// its reply, if it's a request.
    pub async fn dispatch(&self, body: &str) -> Result<DispatchOutcome, ProxyError> {
        let message = JsonRpcMessage::from_json(body).map_err(ProxyError::Parse)?;
        let handler = self
            .inner
            .handler
            .lock()
            .expect("lock not poisoned")
            .clone()
            .ok_or_else(|| ProxyError::Internal("session transport has no handler attached".to_string()))?;

        match message {
            JsonRpcMessage::Request(request) => {
                let id = request.id.clone();
                let (tx, rx) = oneshot::channel();
                self.inner.pending.insert(id.clone(), tx);
                handler
                    .handle_message(JsonRpcMessage::Request(request), MessageContext::now())
                    .await;
                let response = rx.await.map_err(|_| {
                    self.inner.pending.remove(&id);
                    ProxyError::Internal("session transport dropped the reply channel".to_string())
                })?;
                Ok(DispatchOutcome::Response(response))
            }
            JsonRpcMessage::Notification(notification) => {
                handler
                    .handle_message(JsonRpcMessage::Notification(notification), MessageContext::now())
                    .await;
                Ok(DispatchOutcome::Accepted)
            }
            JsonRpcMessage::Response(_) => Err(ProxyError::BadRequest(
                "a POST body must be a JSON-RPC request or notification".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Transport for SessionTransport {
    type Error = TransportError;

    async fn start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        let handler = self.inner.handler.lock().expect("lock not poisoned").clone();
        if let Some(handler) = handler {
            handler.handle_close().await;
        }
        Ok(())
    }

    async fn send(&mut self, message: JsonRpcMessage) -> Result<(), Self::Error> {
        if let JsonRpcMessage::Response(response) = &message {
            if let Some(id) = &response.id {
                if let Some((_, sender)) = self.inner.pending.remove(id) {
                    let _ = sender.send(response.clone());
                    return Ok(());
                }
            }
        }
        // No POST is waiting on this one — it's a server push. Dropped
        // silently if nobody is subscribed to the SSE stream right now.
        let _ = self.inner.outbound.send(message);
        Ok(())
    }

    fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        *self.inner.handler.lock().expect("lock not poisoned") = Some(handler);
    }
}

struct SessionEntry<C: Transport<Error = TransportError> + 'static> {
    transport: SessionTransport,
    context: PassthroughContext<SessionTransport, C>,
}

/// Outcome of dispatching one HTTP request to a session.
#[derive(Debug)]
pub enum HttpOutcome {
    /// A JSON-RPC reply; the caller should echo `session_id` back as
    /// `Mcp-Session-Id`.
    Response { session_id: Uuid, body: JsonRpcResponse },
    /// A notification was accepted; no body, `session_id` still echoed.
    Accepted { session_id: Uuid },
}

/// Owns every live session's [`PassthroughContext`], keyed by the session id
/// minted on `initialize`.
pub struct SessionManager<C: Transport<Error = TransportError> + 'static> {
    sessions: DashMap<Uuid, SessionEntry<C>>,
    target_factory: Arc<dyn Fn() -> C + Send + Sync>,
    hook_configs_factory: Arc<dyn Fn() -> Vec<HookConfig> + Send + Sync>,
    other_policy: OtherRequestPolicy,
}

impl<C: Transport<Error = TransportError> + 'static> SessionManager<C> {
    /// `target_factory` builds a fresh target-facing transport per session
    /// (each session's [`crate::transport::http::HttpClientTransport`]
    /// tracks its own `Mcp-Session-Id` against the target, so these can't
    /// be shared); `hook_configs_factory` builds a fresh hook chain
    /// configuration per session in the same shape every time.
    pub fn new(
        target_factory: impl Fn() -> C + Send + Sync + 'static,
        hook_configs_factory: impl Fn() -> Vec<HookConfig> + Send + Sync + 'static,
        other_policy: OtherRequestPolicy,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            target_factory: Arc::new(target_factory),
            hook_configs_factory: Arc::new(hook_configs_factory),
            other_policy,
        }
    }

    /// Dispatch one HTTP POST body, minting a session first if this is an
    /// `initialize` call with no session header (spec.md §6).
    pub async fn dispatch(&self, session_header: Option<Uuid>, body: &str) -> Result<HttpOutcome, ProxyError> {
        let value: Value = serde_json::from_str(body).map_err(ProxyError::Parse)?;
        let is_initialize = value.get("method").and_then(|m| m.as_str()) == Some(methods::INITIALIZE);

        let session_id = match (session_header, is_initialize) {
            (Some(id), _) => id,
            (None, true) => {
                let id = Uuid::new_v4();
                self.open_session(id).await?;
                id
            }
            (None, false) => {
                return Err(ProxyError::BadRequest(
                    "missing Mcp-Session-Id header on a non-initialize request".to_string(),
                ));
            }
        };

        let entry = self
            .sessions
            .get(&session_id)
            .ok_or_else(|| ProxyError::BadRequest(format!("unknown session '{session_id}'")))?;

        match entry.transport.dispatch(body).await? {
            DispatchOutcome::Response(body) => Ok(HttpOutcome::Response { session_id, body }),
            DispatchOutcome::Accepted => Ok(HttpOutcome::Accepted { session_id }),
        }
    }

    /// Subscribe to a session's SSE stream for the GET `/mcp` handler.
    pub fn subscribe(&self, session_id: Uuid) -> Option<broadcast::Receiver<JsonRpcMessage>> {
        self.sessions.get(&session_id).map(|entry| entry.transport.subscribe())
    }

    async fn open_session(&self, session_id: Uuid) -> Result<(), ProxyError> {
        let transport = SessionTransport::new();
        let target = (self.target_factory)();
        let hook_configs = (self.hook_configs_factory)();
        let context = PassthroughContext::new(session_id.to_string(), hook_configs, self.other_policy);

        context
            .connect(transport.clone(), Some(target))
            .await
            .map_err(|err| ProxyError::Internal(err.to_string()))?;

        self.sessions.insert(session_id, SessionEntry { transport, context });
        Ok(())
    }

    /// `DELETE /mcp`: close the session's context and drop it from the map.
    pub async fn close_session(&self, session_id: Uuid) -> Result<(), ProxyError> {
        if let Some((_, entry)) = self.sessions.remove(&session_id) {
            if let Err(err) = entry.context.close().await {
                warn!(%session_id, %err, "closing session context failed");
            }
        }
        Ok(())
    }

    /// Close every live session; used on proxy shutdown.
    pub async fn remove_all_sessions(&self) {
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            let _ = self.close_session(id).await;
        }
    }

    /// Number of sessions currently live.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
