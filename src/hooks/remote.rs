//! Remote hook client (C3)
//!
//! Adapts an HTTP service into a [`Hook`]: each call becomes one POST to
//! `{base_url}/{methodName}`. A remote hook is never authoritative for
//! failure — network errors, non-2xx responses, unparseable bodies, and an
//! explicit `{"action":"error", ...}` whose message contains "not
//! implemented" all collapse to `Continue` with the payload unchanged.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::mcp::TransportError;

use super::contract::{Hook, HookError, HookMethodSet, HookResult, RequestContext, ResponseHookResult};

#[derive(Serialize)]
struct RequestEnvelope<'a, T: Serialize> {
    session_id: &'a str,
    params: &'a T,
}

#[derive(Serialize)]
struct ResponseEnvelope<'a, T: Serialize, O: Serialize> {
    original_request: &'a O,
    params: &'a T,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum WireRequestOutcome<T> {
    Continue { payload: T },
    Respond { response: JsonRpcResponse },
    Abort { reason: String },
    Error { message: String },
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum WireResponseOutcome<T> {
    Continue { payload: T },
    Abort { reason: String },
    Error { message: String },
}

fn is_not_implemented(message: &str) -> bool {
    message.to_lowercase().contains("not implemented")
}

async fn call_request_hook<T>(
    client: &Client,
    base_url: &Url,
    hook_name: &str,
    method: &str,
    session_id: &str,
    payload: T,
) -> Result<HookResult<T>, HookError>
where
    T: Serialize + DeserializeOwned + Send,
{
    let url = match base_url.join(method) {
        Ok(url) => url,
        Err(err) => {
            warn!(hook = hook_name, %err, "invalid remote hook url, continuing unmodified");
            return Ok(HookResult::Continue(payload));
        }
    };

    let send_result = client
        .post(url)
        .json(&RequestEnvelope {
            session_id,
            params: &payload,
        })
        .send()
        .await;

    let response = match send_result {
        Ok(response) => response,
        Err(err) => {
            warn!(hook = hook_name, %err, "remote hook unreachable, continuing unmodified");
            return Ok(HookResult::Continue(payload));
        }
    };

    if !response.status().is_success() {
        warn!(
            hook = hook_name,
            status = %response.status(),
            "remote hook returned non-success status, continuing unmodified"
        );
        return Ok(HookResult::Continue(payload));
    }

    let outcome: WireRequestOutcome<T> = match response.json().await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(hook = hook_name, %err, "remote hook body did not parse, continuing unmodified");
            return Ok(HookResult::Continue(payload));
        }
    };

    match outcome {
        WireRequestOutcome::Continue { payload } => Ok(HookResult::Continue(payload)),
        WireRequestOutcome::Respond { response } => Ok(HookResult::Respond(response)),
        WireRequestOutcome::Abort { reason } => Ok(HookResult::Abort { reason }),
        WireRequestOutcome::Error { message } if is_not_implemented(&message) => {
            Ok(HookResult::Continue(payload))
        }
        WireRequestOutcome::Error { message } => {
            warn!(hook = hook_name, message, "remote hook reported an error, continuing unmodified");
            Ok(HookResult::Continue(payload))
        }
    }
}

async fn call_response_hook<T, O>(
    client: &Client,
    base_url: &Url,
    hook_name: &str,
    method: &str,
    original: &O,
    payload: T,
) -> Result<ResponseHookResult<T>, HookError>
where
    T: Serialize + DeserializeOwned + Send,
    O: Serialize + Sync,
{
    let url = match base_url.join(method) {
        Ok(url) => url,
        Err(err) => {
            warn!(hook = hook_name, %err, "invalid remote hook url, continuing unmodified");
            return Ok(ResponseHookResult::Continue(payload));
        }
    };

    let send_result = client
        .post(url)
        .json(&ResponseEnvelope {
            original_request: original,
            params: &payload,
        })
        .send()
        .await;

    let response = match send_result {
        Ok(response) => response,
        Err(err) => {
            warn!(hook = hook_name, %err, "remote hook unreachable, continuing unmodified");
            return Ok(ResponseHookResult::Continue(payload));
        }
    };

    if !response.status().is_success() {
        warn!(
            hook = hook_name,
            status = %response.status(),
            "remote hook returned non-success status, continuing unmodified"
        );
        return Ok(ResponseHookResult::Continue(payload));
    }

    let outcome: WireResponseOutcome<T> = match response.json().await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(hook = hook_name, %err, "remote hook body did not parse, continuing unmodified");
            return Ok(ResponseHookResult::Continue(payload));
        }
    };

    match outcome {
        WireResponseOutcome::Continue { payload } => Ok(ResponseHookResult::Continue(payload)),
        WireResponseOutcome::Abort { reason } => Ok(ResponseHookResult::Abort { reason }),
        WireResponseOutcome::Error { message } if is_not_implemented(&message) => {
            Ok(ResponseHookResult::Continue(payload))
        }
        WireResponseOutcome::Error { message } => {
            warn!(hook = hook_name, message, "remote hook reported an error, continuing unmodified");
            Ok(ResponseHookResult::Continue(payload))
        }
    }
}

/// Adapts a remote HTTP hook service into the [`Hook`] trait.
pub struct RemoteHookClient {
    name: String,
    base_url: Url,
    methods: HookMethodSet,
    client: Client,
}

impl RemoteHookClient {
    /// Build a client for the hook service at `base_url`, advertising
    /// `methods` as what it overrides (consulted by [`super::router::HookRouter`]
    /// on the serving side, not by this client).
    pub fn new(name: impl Into<String>, base_url: Url, methods: HookMethodSet) -> Self {
        Self {
            name: name.into(),
            base_url,
            methods,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Hook for RemoteHookClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_methods(&self) -> HookMethodSet {
        self.methods
    }

    async fn process_initialize_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        call_request_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processInitializeRequest",
            &ctx.session_id,
            request,
        )
        .await
    }

    async fn process_initialize_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processInitializeResult",
            original_request,
            response,
        )
        .await
    }

    async fn process_list_tools_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        call_request_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processListToolsRequest",
            &ctx.session_id,
            request,
        )
        .await
    }

    async fn process_list_tools_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processListToolsResult",
            original_request,
            response,
        )
        .await
    }

    async fn process_call_tool_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        call_request_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processCallToolRequest",
            &ctx.session_id,
            request,
        )
        .await
    }

    async fn process_call_tool_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processCallToolResult",
            original_request,
            response,
        )
        .await
    }

    async fn process_other_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        call_request_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processOtherRequest",
            &ctx.session_id,
            request,
        )
        .await
    }

    async fn process_other_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processOtherResult",
            original_request,
            response,
        )
        .await
    }

    async fn process_target_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        call_request_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processTargetRequest",
            &ctx.session_id,
            request,
        )
        .await
    }

    async fn process_target_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processTargetResult",
            original_request,
            response,
        )
        .await
    }

    async fn process_notification(
        &self,
        notification: JsonRpcNotification,
        ctx: &RequestContext,
    ) -> Result<ResponseHookResult<JsonRpcNotification>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processNotification",
            &ctx.session_id.clone(),
            notification,
        )
        .await
    }

    async fn process_target_notification(
        &self,
        notification: JsonRpcNotification,
        ctx: &RequestContext,
    ) -> Result<ResponseHookResult<JsonRpcNotification>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processTargetNotification",
            &ctx.session_id.clone(),
            notification,
        )
        .await
    }

    async fn process_initialize_transport_error(
        &self,
        error: TransportError,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processInitializeTransportError",
            original_request,
            error,
        )
        .await
    }

    async fn process_list_tools_transport_error(
        &self,
        error: TransportError,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processListToolsTransportError",
            original_request,
            error,
        )
        .await
    }

    async fn process_call_tool_transport_error(
        &self,
        error: TransportError,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        call_response_hook(
            &self.client,
            &self.base_url,
            &self.name,
            "processCallToolTransportError",
            original_request,
            error,
        )
        .await
    }
}
