//! Hook Processor (C5)
//!
//! Two free functions drive every forward/reverse traversal in the crate;
//! the caller supplies a small adapter selecting which [`Hook`] method to
//! invoke so one implementation serves `initialize`/`tools/list`/
//! `tools/call`/`other` without duplicating the loop four times.

use std::future::Future;
use std::pin::Pin;

use tracing::warn;

use crate::jsonrpc::JsonRpcResponse;

use super::chain::{HookChain, Node};
use super::contract::{Hook, HookError, HookResult, RequestContext, ResponseHookResult};

/// Adapter selecting which request-path [`Hook`] method a traversal invokes.
pub type RequestHookCall<T> = for<'a> fn(
    &'a dyn Hook,
    T,
    &'a RequestContext,
) -> Pin<Box<dyn Future<Output = Result<HookResult<T>, HookError>> + Send + 'a>>;

/// Adapter selecting which response-path [`Hook`] method a traversal invokes.
/// `O` is the "original request" type carried alongside for context.
pub type ResponseHookCall<T, O> = for<'a> fn(
    &'a dyn Hook,
    T,
    &'a O,
) -> Pin<Box<dyn Future<Output = Result<ResponseHookResult<T>, HookError>> + Send + 'a>>;

/// Outcome of a forward traversal over the request/notification path.
pub enum RequestOutcome<T> {
    /// Every hook continued (or the chain was empty); forward to the target
    Continue {
        /// The payload after every hook's modifications
        payload: T,
        /// Last node that actually processed the payload, `None` if the chain was empty
        resume: Option<Node>,
    },
    /// A hook short-circuited with a synthesized response
    Respond {
        /// The synthesized response
        response: JsonRpcResponse,
        /// The node that produced it; the reverse pass starts here, inclusive
        resume: Option<Node>,
    },
    /// A hook aborted the operation
    Abort {
        /// Reason surfaced to the client as the JSON-RPC error message
        reason: String,
    },
}

/// Outcome of a reverse traversal over the response path.
pub enum ResponseOutcome<T> {
    /// Every hook continued (or there was nothing to traverse)
    Continue(T),
    /// A hook aborted the operation
    Abort {
        /// Reason surfaced to the client as the JSON-RPC error message
        reason: String,
    },
}

/// Run `payload` forward through `chain` starting at the head, invoking
/// `call` at each node.
///
/// Implements spec.md §4.5's `processRequestThroughHooks`: a hook's
/// `Abort` stops immediately; its `Respond` stops and records the node it
/// fired at so the reverse pass can start there; a hook's internal
/// [`HookError`] is logged and treated exactly like `Continue` with the
/// payload unmodified.
pub async fn process_request_through_hooks<T: Clone + Send>(
    chain: &HookChain,
    ctx: &RequestContext,
    mut payload: T,
    call: RequestHookCall<T>,
) -> RequestOutcome<T> {
    let mut current = chain.head();
    let mut last_processed: Option<Node> = None;

    while let Some(node) = current {
        let hook = chain
            .get(node)
            .expect("node came from chain.head()/chain.next(), always in range");
        let attempt = payload.clone();

        match call(hook.as_ref(), attempt, ctx).await {
            Ok(HookResult::Continue(next_payload)) => {
                payload = next_payload;
                last_processed = Some(node);
                current = chain.next(node);
            }
            Ok(HookResult::Respond(response)) => {
                return RequestOutcome::Respond {
                    response,
                    resume: Some(node),
                };
            }
            Ok(HookResult::Abort { reason }) => {
                return RequestOutcome::Abort { reason };
            }
            Err(err) => {
                warn!(
                    hook = hook.name(),
                    error = %err,
                    "request hook failed, continuing with unmodified payload"
                );
                last_processed = Some(node);
                current = chain.next(node);
            }
        }
    }

    RequestOutcome::Continue {
        payload,
        resume: last_processed,
    }
}

/// Run `payload` backward through `chain` starting at `resume_node`
/// (inclusive), invoking `call` at each node.
///
/// Implements spec.md §4.5's `processResponseThroughHooks`. A `resume_node`
/// of `None` means the forward pass never processed any hook (empty chain,
/// or a `Respond` before the first hook ran), so the reverse pass is a
/// no-op — the resume-symmetry invariant (spec.md §8 property 3).
pub async fn process_response_through_hooks<T: Clone + Send, O: Send + Sync>(
    chain: &HookChain,
    resume_node: Option<Node>,
    original: &O,
    mut payload: T,
    call: ResponseHookCall<T, O>,
) -> ResponseOutcome<T> {
    let mut current = resume_node;

    while let Some(node) = current {
        let hook = chain
            .get(node)
            .expect("resume_node and chain.previous() always stay in range");
        let attempt = payload.clone();

        match call(hook.as_ref(), attempt, original).await {
            Ok(ResponseHookResult::Continue(next_payload)) => {
                payload = next_payload;
                current = chain.previous(node);
            }
            Ok(ResponseHookResult::Abort { reason }) => {
                return ResponseOutcome::Abort { reason };
            }
            Err(err) => {
                warn!(
                    hook = hook.name(),
                    error = %err,
                    "response hook failed, continuing with unmodified payload"
                );
                current = chain.previous(node);
            }
        }
    }

    ResponseOutcome::Continue(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{JsonRpcErrorObject, JsonRpcRequest, RequestId};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingHook {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Hook for RecordingHook {
        fn name(&self) -> &str {
            self.name
        }

        async fn process_call_tool_request(
            &self,
            mut request: JsonRpcRequest,
            _ctx: &RequestContext,
        ) -> Result<HookResult<JsonRpcRequest>, HookError> {
            self.log.lock().unwrap().push(format!("{}-req", self.name));
            request.merge_meta(serde_json::json!({ self.name: true }));
            Ok(HookResult::Continue(request))
        }

        async fn process_call_tool_result(
            &self,
            response: JsonRpcResponse,
            _original_request: &JsonRpcRequest,
        ) -> Result<ResponseHookResult<JsonRpcResponse>, HookError> {
            self.log.lock().unwrap().push(format!("{}-resp", self.name));
            Ok(ResponseHookResult::Continue(response))
        }
    }

    fn call_tool_request<'a>(
        hook: &'a dyn Hook,
        request: JsonRpcRequest,
        ctx: &'a RequestContext,
    ) -> Pin<Box<dyn Future<Output = Result<HookResult<JsonRpcRequest>, HookError>> + Send + 'a>>
    {
        Box::pin(hook.process_call_tool_request(request, ctx))
    }

    fn call_tool_result<'a>(
        hook: &'a dyn Hook,
        response: JsonRpcResponse,
        original: &'a JsonRpcRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ResponseHookResult<JsonRpcResponse>, HookError>> + Send + 'a>>
    {
        Box::pin(hook.process_call_tool_result(response, original))
    }

    #[tokio::test]
    async fn hook_order_is_forward_then_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = HookChain::new()
            .append(Arc::new(RecordingHook {
                name: "h1",
                log: log.clone(),
            }))
            .append(Arc::new(RecordingHook {
                name: "h2",
                log: log.clone(),
            }))
            .append(Arc::new(RecordingHook {
                name: "h3",
                log: log.clone(),
            }));

        let ctx = RequestContext::new("session-1");
        let request = JsonRpcRequest::new("tools/call", None, RequestId::new_number(1));

        let outcome =
            process_request_through_hooks(&chain, &ctx, request.clone(), call_tool_request).await;
        let (payload, resume) = match outcome {
            RequestOutcome::Continue { payload, resume } => (payload, resume),
            _ => panic!("expected continue"),
        };
        assert_eq!(resume, chain.tail());

        let response = JsonRpcResponse::success(serde_json::json!({}), RequestId::new_number(1));
        let outcome =
            process_response_through_hooks(&chain, resume, &payload, response, call_tool_result)
                .await;
        assert!(matches!(outcome, ResponseOutcome::Continue(_)));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1-req", "h2-req", "h3-req", "h3-resp", "h2-resp", "h1-resp"]
        );
    }

    struct RespondingHook;
    #[async_trait]
    impl Hook for RespondingHook {
        fn name(&self) -> &str {
            "responder"
        }

        async fn process_call_tool_request(
            &self,
            _request: JsonRpcRequest,
            _ctx: &RequestContext,
        ) -> Result<HookResult<JsonRpcRequest>, HookError> {
            Ok(HookResult::Respond(JsonRpcResponse::success(
                serde_json::json!({"short_circuited": true}),
                RequestId::new_number(1),
            )))
        }
    }

    #[tokio::test]
    async fn respond_skips_downstream_hooks_on_both_paths() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = HookChain::new()
            .append(Arc::new(RecordingHook {
                name: "h1",
                log: log.clone(),
            }))
            .append(Arc::new(RespondingHook))
            .append(Arc::new(RecordingHook {
                name: "h3",
                log: log.clone(),
            }));

        let ctx = RequestContext::new("session-1");
        let request = JsonRpcRequest::new("tools/call", None, RequestId::new_number(1));

        let outcome =
            process_request_through_hooks(&chain, &ctx, request.clone(), call_tool_request).await;
        let (response, resume) = match outcome {
            RequestOutcome::Respond { response, resume } => (response, resume),
            _ => panic!("expected respond"),
        };

        let outcome =
            process_response_through_hooks(&chain, resume, &request, response, call_tool_result)
                .await;
        assert!(matches!(outcome, ResponseOutcome::Continue(_)));

        // h3 never saw the request or the response; h1 saw only the response.
        assert_eq!(*log.lock().unwrap(), vec!["h1-req", "h1-resp"]);
    }

    struct AbortingHook;
    #[async_trait]
    impl Hook for AbortingHook {
        fn name(&self) -> &str {
            "aborter"
        }

        async fn process_call_tool_request(
            &self,
            _request: JsonRpcRequest,
            _ctx: &RequestContext,
        ) -> Result<HookResult<JsonRpcRequest>, HookError> {
            Ok(HookResult::Abort {
                reason: "destructive tool call".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn abort_short_circuits_with_no_target_call() {
        let chain = HookChain::new().append(Arc::new(AbortingHook));
        let ctx = RequestContext::new("session-1");
        let request = JsonRpcRequest::new("tools/call", None, RequestId::new_number(1));

        let outcome = process_request_through_hooks(&chain, &ctx, request, call_tool_request).await;
        match outcome {
            RequestOutcome::Abort { reason } => assert!(reason.contains("destructive")),
            _ => panic!("expected abort"),
        }
    }

    struct FailingHook;
    #[async_trait]
    impl Hook for FailingHook {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn process_call_tool_request(
            &self,
            _request: JsonRpcRequest,
            _ctx: &RequestContext,
        ) -> Result<HookResult<JsonRpcRequest>, HookError> {
            Err(HookError::Failed {
                hook: "flaky".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn hook_error_degrades_to_continue_with_unmodified_payload() {
        let chain = HookChain::new().append(Arc::new(FailingHook));
        let ctx = RequestContext::new("session-1");
        let request = JsonRpcRequest::new("tools/call", None, RequestId::new_number(7));

        let outcome =
            process_request_through_hooks(&chain, &ctx, request.clone(), call_tool_request).await;
        match outcome {
            RequestOutcome::Continue { payload, resume } => {
                assert_eq!(payload, request);
                assert_eq!(resume, chain.tail());
            }
            _ => panic!("expected continue"),
        }
    }

    #[tokio::test]
    async fn empty_chain_continues_with_no_resume_node() {
        let chain = HookChain::new();
        let ctx = RequestContext::new("session-1");
        let request = JsonRpcRequest::new("tools/call", None, RequestId::new_number(1));

        let outcome =
            process_request_through_hooks(&chain, &ctx, request.clone(), call_tool_request).await;
        match outcome {
            RequestOutcome::Continue { payload, resume } => {
                assert_eq!(payload, request);
                assert!(resume.is_none());
            }
            _ => panic!("expected continue"),
        }

        let response = JsonRpcResponse::success(serde_json::json!({}), RequestId::new_number(1));
        let outcome =
            process_response_through_hooks(&chain, None, &request, response.clone(), call_tool_result)
                .await;
        match outcome {
            ResponseOutcome::Continue(r) => assert_eq!(r, response),
            _ => panic!("expected continue"),
        }
    }

    #[allow(dead_code)]
    fn unused_error_object_reference(_e: JsonRpcErrorObject) {}
}
