//! Local hook adapter
//!
//! Wraps an in-process [`Hook`] implementation so it can sit in a
//! [`crate::hooks::chain::HookChain`] alongside [`crate::hooks::remote::RemoteHookClient`]
//! entries built from the same configuration list, without the chain caring
//! which kind of hook a given slot actually is.

use async_trait::async_trait;

use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::mcp::TransportError;

use super::contract::{Hook, HookError, HookMethodSet, HookResult, RequestContext, ResponseHookResult};
use std::sync::Arc;

/// Forwards every [`Hook`] method to an in-process implementation.
pub struct LocalHookClient {
    inner: Arc<dyn Hook>,
}

impl LocalHookClient {
    /// Wrap an in-process hook
    pub fn new(inner: Arc<dyn Hook>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Hook for LocalHookClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supported_methods(&self) -> HookMethodSet {
        self.inner.supported_methods()
    }

    async fn process_initialize_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        self.inner.process_initialize_request(request, ctx).await
    }

    async fn process_initialize_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        self.inner
            .process_initialize_result(response, original_request)
            .await
    }

    async fn process_list_tools_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        self.inner.process_list_tools_request(request, ctx).await
    }

    async fn process_list_tools_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        self.inner
            .process_list_tools_result(response, original_request)
            .await
    }

    async fn process_call_tool_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        self.inner.process_call_tool_request(request, ctx).await
    }

    async fn process_call_tool_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        self.inner
            .process_call_tool_result(response, original_request)
            .await
    }

    async fn process_other_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        self.inner.process_other_request(request, ctx).await
    }

    async fn process_other_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        self.inner
            .process_other_result(response, original_request)
            .await
    }

    async fn process_target_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<HookResult<JsonRpcRequest>, HookError> {
        self.inner.process_target_request(request, ctx).await
    }

    async fn process_target_result(
        &self,
        response: JsonRpcResponse,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
        self.inner
            .process_target_result(response, original_request)
            .await
    }

    async fn process_notification(
        &self,
        notification: JsonRpcNotification,
        ctx: &RequestContext,
    ) -> Result<ResponseHookResult<JsonRpcNotification>, HookError> {
        self.inner.process_notification(notification, ctx).await
    }

    async fn process_target_notification(
        &self,
        notification: JsonRpcNotification,
        ctx: &RequestContext,
    ) -> Result<ResponseHookResult<JsonRpcNotification>, HookError> {
        self.inner
            .process_target_notification(notification, ctx)
            .await
    }

    async fn process_initialize_transport_error(
        &self,
        error: TransportError,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        self.inner
            .process_initialize_transport_error(error, original_request)
            .await
    }

    async fn process_list_tools_transport_error(
        &self,
        error: TransportError,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        self.inner
            .process_list_tools_transport_error(error, original_request)
            .await
    }

    async fn process_call_tool_transport_error(
        &self,
        error: TransportError,
        original_request: &JsonRpcRequest,
    ) -> Result<ResponseHookResult<TransportError>, HookError> {
        self.inner
            .process_call_tool_transport_error(error, original_request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::RequestId;

    struct CountingHook;
    #[async_trait]
    impl Hook for CountingHook {
        fn name(&self) -> &str {
            "counter"
        }

        fn supported_methods(&self) -> HookMethodSet {
            HookMethodSet::CALL_TOOL_REQUEST
        }

        async fn process_call_tool_request(
            &self,
            mut request: JsonRpcRequest,
            _ctx: &RequestContext,
        ) -> Result<HookResult<JsonRpcRequest>, HookError> {
            request.merge_meta(serde_json::json!({"counted": true}));
            Ok(HookResult::Continue(request))
        }
    }

    #[tokio::test]
    async fn forwards_to_the_wrapped_hook() {
        let client = LocalHookClient::new(Arc::new(CountingHook));
        assert_eq!(client.name(), "counter");
        assert_eq!(client.supported_methods(), HookMethodSet::CALL_TOOL_REQUEST);

        let ctx = RequestContext::new("session-1");
        let request = JsonRpcRequest::new("tools/call", None, RequestId::new_number(1));
        let result = client.process_call_tool_request(request, &ctx).await.unwrap();
        match result {
            HookResult::Continue(r) => {
                assert_eq!(r.meta().unwrap()["counted"], true);
            }
            _ => panic!("expected continue"),
        }
    }
}
