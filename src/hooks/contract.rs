//! Hook Contract (C3)
//!
//! Defines the `Hook` trait every local or remote hook implementation
//! satisfies, the per-call context attached to a traversal, and the result
//! types a hook returns at each point in the chain.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::transport::mcp::TransportError;

/// Per-request context attached as a message traverses the hook chain.
///
/// Hooks may mutate `headers`/`host`/`path`; the transport consults the
/// final context when sending to the target.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Id of the request being processed, if this traversal is request-shaped
    pub request_id: Option<RequestId>,
    /// Session this traversal belongs to
    pub session_id: String,
    /// Outbound headers, mutable by hooks
    pub headers: HashMap<String, String>,
    /// Target host override
    pub host: Option<String>,
    /// Target path override
    pub path: Option<String>,
}

impl RequestContext {
    /// Start a context for a given session with no headers set yet
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            request_id: None,
            session_id: session_id.into(),
            headers: HashMap::new(),
            host: None,
            path: None,
        }
    }

    /// Attach the id of the request this context accompanies
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }
}

/// Failure internal to a hook's own logic (not a deliberate `abort` decision).
///
/// A hook that encounters one of these while processing is treated exactly
/// like a missing method: the processor logs it and continues with the
/// payload unmodified.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook's own logic failed
    #[error("hook '{hook}' failed: {message}")]
    Failed {
        /// Name of the hook that failed
        hook: String,
        /// Description of the failure
        message: String,
    },
}

/// Result of a request-path or notification-outbound hook call.
///
/// `Respond` is legal here because the hook is looking at a message that
/// still expects a reply; it is not representable on the response path
/// (see [`ResponseHookResult`]).
#[derive(Debug, Clone)]
pub enum HookResult<T> {
    /// Keep traversing with the (possibly modified) payload
    Continue(T),
    /// Short-circuit with a synthesized response
    Respond(JsonRpcResponse),
    /// Fail the operation
    Abort {
        /// Human-readable reason, surfaced as the JSON-RPC error message
        reason: String,
    },
}

/// Result of a response-path, notification, or transport-error hook call.
///
/// `Respond` is illegal here by construction: once a response already
/// exists there is nothing left to respond to.
#[derive(Debug, Clone)]
pub enum ResponseHookResult<T> {
    /// Keep traversing with the (possibly modified) payload
    Continue(T),
    /// Fail the operation
    Abort {
        /// Human-readable reason, surfaced as the JSON-RPC error message
        reason: String,
    },
}

/// Bitset of which optional [`Hook`] methods an implementation overrides.
///
/// Used by [`crate::hooks::router::HookRouter`] to decide which HTTP routes
/// to mount for a remote hook, and by tests asserting a hook's declared
/// surface. A hook that doesn't override `supported_methods` advertises
/// none, which is always consistent (every method already defaults to
/// `continue`) but means a `RemoteHookClient` pointed at it would mount no
/// routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookMethodSet(u32);

impl HookMethodSet {
    /// No methods
    pub const NONE: Self = Self(0);
    /// `processInitializeRequest`
    pub const INITIALIZE_REQUEST: Self = Self(1 << 0);
    /// `processInitializeResult`
    pub const INITIALIZE_RESULT: Self = Self(1 << 1);
    /// `processListToolsRequest`
    pub const LIST_TOOLS_REQUEST: Self = Self(1 << 2);
    /// `processListToolsResult`
    pub const LIST_TOOLS_RESULT: Self = Self(1 << 3);
    /// `processCallToolRequest`
    pub const CALL_TOOL_REQUEST: Self = Self(1 << 4);
    /// `processCallToolResult`
    pub const CALL_TOOL_RESULT: Self = Self(1 << 5);
    /// `processOtherRequest`
    pub const OTHER_REQUEST: Self = Self(1 << 6);
    /// `processOtherResult`
    pub const OTHER_RESULT: Self = Self(1 << 7);
    /// `processTargetRequest`
    pub const TARGET_REQUEST: Self = Self(1 << 8);
    /// `processTargetResult`
    pub const TARGET_RESULT: Self = Self(1 << 9);
    /// `processNotification`
    pub const NOTIFICATION: Self = Self(1 << 10);
    /// `processTargetNotification`
    pub const TARGET_NOTIFICATION: Self = Self(1 << 11);
    /// `processInitializeTransportError`
    pub const INITIALIZE_TRANSPORT_ERROR: Self = Self(1 << 12);
    /// `processListToolsTransportError`
    pub const LIST_TOOLS_TRANSPORT_ERROR: Self = Self(1 << 13);
    /// `processCallToolTransportError`
    pub const CALL_TOOL_TRANSPORT_ERROR: Self = Self(1 << 14);

    /// Combine two sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether `other` is fully contained in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for HookMethodSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A named, chainable observer/modifier of the proxy message path.
///
/// Every method defaults to `continue` with the payload unmodified, so an
/// implementation only overrides the handful of methods it cares about —
/// the "wide interface, default pass-through" pattern from spec.md §9's
/// design notes.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Stable identifier logged and used for `find_by_name` lookups
    fn name(&self) -> &str;

    /// Which methods below this hook actually overrides, for remote routing
    fn supported_methods(&self) -> HookMethodSet {
        HookMethodSet::NONE
    }

    /// Observe/modify an `initialize` request
    async fn process_initialize_request(
        &self,
        request: JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        Ok(HookResult::Continue(request))
    }

    /// Observe/modify an `initialize` result
    async fn process_initialize_result(
        &self,
        response: JsonRpcResponse,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        Ok(ResponseHookResult::Continue(response))
    }

    /// Observe/modify a `tools/list` request
    async fn process_list_tools_request(
        &self,
        request: JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        Ok(HookResult::Continue(request))
    }

    /// Observe/modify a `tools/list` result
    async fn process_list_tools_result(
        &self,
        response: JsonRpcResponse,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        Ok(ResponseHookResult::Continue(response))
    }

    /// Observe/modify a `tools/call` request
    async fn process_call_tool_request(
        &self,
        request: JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        Ok(HookResult::Continue(request))
    }

    /// Observe/modify a `tools/call` result
    async fn process_call_tool_result(
        &self,
        response: JsonRpcResponse,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        Ok(ResponseHookResult::Continue(response))
    }

    /// Observe/modify a request whose method isn't one of the recognized few
    async fn process_other_request(
        &self,
        request: JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        Ok(HookResult::Continue(request))
    }

    /// Observe/modify the result of an unrecognized-method request
    async fn process_other_result(
        &self,
        response: JsonRpcResponse,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        Ok(ResponseHookResult::Continue(response))
    }

    /// Observe/modify a server(target)-initiated request, on its way to the client
    async fn process_target_request(
        &self,
        request: JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        Ok(HookResult::Continue(request))
    }

    /// Observe/modify the client's result for a target-initiated request
    async fn process_target_result(
        &self,
        response: JsonRpcResponse,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        Ok(ResponseHookResult::Continue(response))
    }

    /// Observe/modify a client→target notification
    async fn process_notification(
        &self,
        notification: JsonRpcNotification,
        _ctx: &RequestContext,
    ) -> Result<ResponseHookResult<JsonRpcNotification>, HookError> {
        Ok(ResponseHookResult::Continue(notification))
    }

    /// Observe/modify a target→client notification
    async fn process_target_notification(
        &self,
        notification: JsonRpcNotification,
        _ctx: &RequestContext,
    ) -> Result<ResponseHookResult<JsonRpcNotification>, HookError> {
        Ok(ResponseHookResult::Continue(notification))
    }

    /// Observe/modify a transport-level failure answering an `initialize` call
    async fn process_initialize_transport_error(
        &self,
        error: TransportError,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        Ok(ResponseHookResult::Continue(error))
    }

    /// Observe/modify a transport-level failure answering a `tools/list` call
    async fn process_list_tools_transport_error(
        &self,
        error: TransportError,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        Ok(ResponseHookResult::Continue(error))
    }

    /// Observe/modify a transport-level failure answering a `tools/call` call
    async fn process_call_tool_transport_error(
        &self,
        error: TransportError,
        _original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        Ok(ResponseHookResult::Continue(error))
    }
}
