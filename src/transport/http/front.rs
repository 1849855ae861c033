//! Proxy HTTP front
//!
//! The `axum::Router` a [`crate::session::SessionManager`] serves to MCP
//! clients: `POST`/`GET`/`DELETE` on the configured MCP path dispatch to a
//! session, everything else is a transparent reverse-proxy to the target.
//! Grounded on the route layout and session-id-in-headers pattern of
//! `airs_mcp::transport::adapters::http::axum::handlers::create_router`/
//! `handle_mcp_request`/`handle_mcp_get`, adapted from that file's
//! session-manager-as-a-lookup-table shape to one where the session IS the
//! dispatch target (a `PassthroughContext` per id, not a shared handler).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::Stream;
use reqwest::{Client, Url};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tracing::warn;
use uuid::Uuid;

use crate::error::ProxyError;
use crate::jsonrpc::{JsonRpcErrorObject, JsonRpcResponse};
use crate::session::{HttpOutcome, SessionManager};
use crate::transport::mcp::{Transport, TransportError};

/// Request headers dropped before reverse-proxying to the target, per
/// RFC 7230 §6.1 plus the MCP-reserved and cookie headers this proxy
/// handles itself.
const DROPPED_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
    "content-type",
    "accept",
    "accept-encoding",
    "cookie",
    "set-cookie",
    "mcp-session-id",
    "mcp-protocol-version",
    "last-event-id",
];

const SESSION_HEADER: &str = "mcp-session-id";

/// Shared state behind the router.
pub struct ProxyFrontState<C: Transport<Error = TransportError> + 'static> {
    sessions: Arc<SessionManager<C>>,
    reverse_proxy_client: Client,
    target_base_url: Url,
    auth_token: Option<String>,
}

impl<C: Transport<Error = TransportError> + 'static> Clone for ProxyFrontState<C> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            reverse_proxy_client: self.reverse_proxy_client.clone(),
            target_base_url: self.target_base_url.clone(),
            auth_token: self.auth_token.clone(),
        }
    }
}

impl<C: Transport<Error = TransportError> + 'static> ProxyFrontState<C> {
    pub fn new(sessions: Arc<SessionManager<C>>, target_base_url: Url, auth_token: Option<String>) -> Self {
        Self {
            sessions,
            reverse_proxy_client: Client::new(),
            target_base_url,
            auth_token,
        }
    }
}

/// Build the router a [`crate::session::SessionManager`] serves: `mcp_path`
/// (e.g. `SOURCE_SERVER_MCP_PATH`, default `/mcp`) carries the session
/// protocol; every other path reverse-proxies straight to the target.
pub fn build_router<C: Transport<Error = TransportError> + 'static>(
    mcp_path: &str,
    state: ProxyFrontState<C>,
) -> Router {
    Router::new()
        .route(mcp_path, get(handle_get::<C>).post(handle_post::<C>).delete(handle_delete::<C>))
        .fallback(reverse_proxy::<C>)
        .with_state(state)
}

fn session_id_from_headers(headers: &HeaderMap) -> Result<Option<Uuid>, ProxyError> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ProxyError::BadRequest("mcp-session-id header is not valid UTF-8".to_string()))?;
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| ProxyError::BadRequest("mcp-session-id header is not a valid UUID".to_string()))
}

fn proxy_error_response(err: ProxyError) -> Response {
    let status = match &err {
        ProxyError::Parse(_) | ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = JsonRpcResponse::error(JsonRpcErrorObject::new(err.json_rpc_code(), err.to_string()), None);
    (status, Json(body)).into_response()
}

async fn handle_post<C: Transport<Error = TransportError> + 'static>(
    State(state): State<ProxyFrontState<C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = match session_id_from_headers(&headers) {
        Ok(id) => id,
        Err(err) => return proxy_error_response(err),
    };
    let body = match std::str::from_utf8(&body) {
        Ok(body) => body,
        Err(_) => return proxy_error_response(ProxyError::BadRequest("request body is not UTF-8".to_string())),
    };

    match state.sessions.dispatch(session_id, body).await {
        Ok(HttpOutcome::Response { session_id, body }) => {
            let mut response = Json(body).into_response();
            if let Ok(value) = HeaderValue::from_str(&session_id.to_string()) {
                response.headers_mut().insert(SESSION_HEADER, value);
            }
            response
        }
        Ok(HttpOutcome::Accepted { session_id }) => {
            let mut response = StatusCode::ACCEPTED.into_response();
            if let Ok(value) = HeaderValue::from_str(&session_id.to_string()) {
                response.headers_mut().insert(SESSION_HEADER, value);
            }
            response
        }
        Err(err) => proxy_error_response(err),
    }
}

async fn handle_get<C: Transport<Error = TransportError> + 'static>(
    State(state): State<ProxyFrontState<C>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    let session_id = session_id_from_headers(&headers)
        .map_err(proxy_error_response)?
        .ok_or_else(|| {
            proxy_error_response(ProxyError::BadRequest("GET requires an mcp-session-id header".to_string()))
        })?;

    let receiver = state
        .sessions
        .subscribe(session_id)
        .ok_or_else(|| proxy_error_response(ProxyError::BadRequest(format!("unknown session '{session_id}'"))))?;

    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(message) => message
            .to_json()
            .ok()
            .map(|data| Ok(Event::default().event("message").data(data))),
        Err(_) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)).text("heartbeat")))
}

async fn handle_delete<C: Transport<Error = TransportError> + 'static>(
    State(state): State<ProxyFrontState<C>>,
    headers: HeaderMap,
) -> Response {
    let session_id = match session_id_from_headers(&headers) {
        Ok(Some(id)) => id,
        Ok(None) => {
            return proxy_error_response(ProxyError::BadRequest(
                "DELETE requires an mcp-session-id header".to_string(),
            ));
        }
        Err(err) => return proxy_error_response(err),
    };

    match state.sessions.close_session(session_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => proxy_error_response(err),
    }
}

/// Transparent reverse-proxy for any path other than the MCP endpoint,
/// filtering hop-by-hop/MCP-reserved headers per spec §6.
async fn reverse_proxy<C: Transport<Error = TransportError> + 'static>(
    State(state): State<ProxyFrontState<C>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let Ok(url) = state.target_base_url.join(path.trim_start_matches('/')) else {
        return (StatusCode::BAD_GATEWAY, "invalid upstream path").into_response();
    };

    let mut builder = state.reverse_proxy_client.request(method, url).body(body);
    for (name, value) in headers.iter() {
        if DROPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if name == axum::http::header::AUTHORIZATION {
            if let Some(token) = &state.auth_token {
                builder = builder.bearer_auth(token);
                continue;
            }
        }
        builder = builder.header(name.clone(), value.clone());
    }

    match builder.send().await {
        Ok(upstream) => {
            let status = upstream.status();
            let mut response_headers = HeaderMap::new();
            for (name, value) in upstream.headers() {
                if !DROPPED_HEADERS.contains(&name.as_str()) {
                    response_headers.insert(HeaderName::from(name.clone()), value.clone());
                }
            }
            let body = upstream.bytes().await.unwrap_or_default();
            let mut response = (status, body).into_response();
            *response.headers_mut() = response_headers;
            response
        }
        Err(err) => {
            warn!(%err, "reverse-proxy request to target failed");
            (StatusCode::BAD_GATEWAY, format!("upstream request failed: {err}")).into_response()
        }
    }
}
