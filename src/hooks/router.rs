//! Hook Router (C8)
//!
//! Serves a local [`Hook`] implementation over HTTP so a remote proxy
//! instance can reach it through [`super::remote::RemoteHookClient`]. Only
//! mounts a route for a method the hook actually overrides (per
//! [`Hook::supported_methods`]) — an unmounted route 404s, which the client
//! already treats as "continue unmodified", so the "missing route" path is
//! exercised for free rather than requiring a special case.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::contract::{Hook, HookMethodSet, HookResult, RequestContext, ResponseHookResult};
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::mcp::TransportError;

#[derive(Deserialize)]
struct RequestEnvelope<T> {
    session_id: String,
    params: T,
}

#[derive(Deserialize)]
struct ResponseEnvelope<T, O> {
    original_request: O,
    params: T,
}

fn request_outcome<T: Serialize>(result: HookResult<T>) -> Json<Value> {
    Json(match result {
        HookResult::Continue(payload) => json!({"action": "continue", "payload": payload}),
        HookResult::Respond(response) => json!({"action": "respond", "response": response}),
        HookResult::Abort { reason } => json!({"action": "abort", "reason": reason}),
    })
}

fn response_outcome<T: Serialize>(result: ResponseHookResult<T>) -> Json<Value> {
    Json(match result {
        ResponseHookResult::Continue(payload) => json!({"action": "continue", "payload": payload}),
        ResponseHookResult::Abort { reason } => json!({"action": "abort", "reason": reason}),
    })
}

macro_rules! request_handler {
    ($fn_name:ident, $method:ident) => {
        async fn $fn_name(
            State(hook): State<Arc<dyn Hook>>,
            Json(body): Json<RequestEnvelope<JsonRpcRequest>>,
        ) -> Json<Value> {
            let ctx = RequestContext::new(body.session_id);
            match hook.$method(body.params, &ctx).await {
                Ok(result) => request_outcome(result),
                Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
            }
        }
    };
}

macro_rules! response_handler {
    ($fn_name:ident, $method:ident) => {
        async fn $fn_name(
            State(hook): State<Arc<dyn Hook>>,
            Json(body): Json<ResponseEnvelope<JsonRpcResponse, JsonRpcRequest>>,
        ) -> Json<Value> {
            match hook.$method(body.params, &body.original_request).await {
                Ok(result) => response_outcome(result),
                Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
            }
        }
    };
}

request_handler!(initialize_request, process_initialize_request);
response_handler!(initialize_result, process_initialize_result);
request_handler!(list_tools_request, process_list_tools_request);
response_handler!(list_tools_result, process_list_tools_result);
request_handler!(call_tool_request, process_call_tool_request);
response_handler!(call_tool_result, process_call_tool_result);
request_handler!(other_request, process_other_request);
response_handler!(other_result, process_other_result);
request_handler!(target_request, process_target_request);
response_handler!(target_result, process_target_result);

async fn notification(
    State(hook): State<Arc<dyn Hook>>,
    Json(body): Json<RequestEnvelope<JsonRpcNotification>>,
) -> Json<Value> {
    let ctx = RequestContext::new(body.session_id);
    match hook.process_notification(body.params, &ctx).await {
        Ok(result) => response_outcome(result),
        Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
    }
}

async fn target_notification(
    State(hook): State<Arc<dyn Hook>>,
    Json(body): Json<RequestEnvelope<JsonRpcNotification>>,
) -> Json<Value> {
    let ctx = RequestContext::new(body.session_id);
    match hook.process_target_notification(body.params, &ctx).await {
        Ok(result) => response_outcome(result),
        Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
    }
}

async fn initialize_transport_error(
    State(hook): State<Arc<dyn Hook>>,
    Json(body): Json<ResponseEnvelope<TransportError, JsonRpcRequest>>,
) -> Json<Value> {
    match hook
        .process_initialize_transport_error(body.params, &body.original_request)
        .await
    {
        Ok(result) => response_outcome(result),
        Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
    }
}

async fn list_tools_transport_error(
    State(hook): State<Arc<dyn Hook>>,
    Json(body): Json<ResponseEnvelope<TransportError, JsonRpcRequest>>,
) -> Json<Value> {
    match hook
        .process_list_tools_transport_error(body.params, &body.original_request)
        .await
    {
        Ok(result) => response_outcome(result),
        Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
    }
}

async fn call_tool_transport_error(
    State(hook): State<Arc<dyn Hook>>,
    Json(body): Json<ResponseEnvelope<TransportError, JsonRpcRequest>>,
) -> Json<Value> {
    match hook
        .process_call_tool_transport_error(body.params, &body.original_request)
        .await
    {
        Ok(result) => response_outcome(result),
        Err(err) => Json(json!({"action": "error", "message": err.to_string()})),
    }
}

/// Builds the `axum::Router` exposing one POST route per method a hook
/// overrides.
pub struct HookRouter;

impl HookRouter {
    /// Mount only the routes `hook.supported_methods()` declares.
    pub fn build(hook: Arc<dyn Hook>) -> Router {
        let methods = hook.supported_methods();
        let mut router = Router::new();

        macro_rules! mount {
            ($flag:expr, $path:expr, $handler:expr) => {
                if methods.contains($flag) {
                    router = router.route($path, post($handler));
                }
            };
        }

        mount!(
            HookMethodSet::INITIALIZE_REQUEST,
            "/processInitializeRequest",
            initialize_request
        );
        mount!(
            HookMethodSet::INITIALIZE_RESULT,
            "/processInitializeResult",
            initialize_result
        );
        mount!(
            HookMethodSet::LIST_TOOLS_REQUEST,
            "/processListToolsRequest",
            list_tools_request
        );
        mount!(
            HookMethodSet::LIST_TOOLS_RESULT,
            "/processListToolsResult",
            list_tools_result
        );
        mount!(
            HookMethodSet::CALL_TOOL_REQUEST,
            "/processCallToolRequest",
            call_tool_request
        );
        mount!(
            HookMethodSet::CALL_TOOL_RESULT,
            "/processCallToolResult",
            call_tool_result
        );
        mount!(HookMethodSet::OTHER_REQUEST, "/processOtherRequest", other_request);
        mount!(HookMethodSet::OTHER_RESULT, "/processOtherResult", other_result);
        mount!(
            HookMethodSet::TARGET_REQUEST,
            "/processTargetRequest",
            target_request
        );
        mount!(
            HookMethodSet::TARGET_RESULT,
            "/processTargetResult",
            target_result
        );
        mount!(HookMethodSet::NOTIFICATION, "/processNotification", notification);
        mount!(
            HookMethodSet::TARGET_NOTIFICATION,
            "/processTargetNotification",
            target_notification
        );
        mount!(
            HookMethodSet::INITIALIZE_TRANSPORT_ERROR,
            "/processInitializeTransportError",
            initialize_transport_error
        );
        mount!(
            HookMethodSet::LIST_TOOLS_TRANSPORT_ERROR,
            "/processListToolsTransportError",
            list_tools_transport_error
        );
        mount!(
            HookMethodSet::CALL_TOOL_TRANSPORT_ERROR,
            "/processCallToolTransportError",
            call_tool_transport_error
        );

        router.with_state(hook)
    }
}
