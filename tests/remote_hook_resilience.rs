//! End-to-end resilience of a remote hook wired into a real
//! `PassthroughContext`: a misbehaving or unreachable hook service must
//! never take the proxy down with it. `hooks/remote.rs`'s own unit tests
//! already exercise `RemoteHookClient` in isolation; this exercises the
//! same failure modes through the full request/response dispatch path.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_passthrough_proxy::context::{HookConfig, OtherRequestPolicy, PassthroughContext};
use mcp_passthrough_proxy::hooks::HookMethodSet;
use mcp_passthrough_proxy::jsonrpc::{methods, JsonRpcMessage, JsonRpcResponse};
use mcp_passthrough_proxy::transport::mcp::{MessageContext, MessageHandler, Transport, TransportError};
use mcp_passthrough_proxy::transport::{InMemoryTransport, ProtocolEndpoint};
use reqwest::Url;
use serde_json::json;
use tokio::sync::Mutex as TokioMutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TargetDriver {
    transport: Arc<TokioMutex<InMemoryTransport>>,
}

#[async_trait]
impl MessageHandler for TargetDriver {
    async fn handle_message(&self, message: JsonRpcMessage, _context: MessageContext) {
        if let JsonRpcMessage::Request(request) = message {
            let response = JsonRpcResponse::success(json!({"tools": [{"name": "greet"}]}), request.id);
            let mut transport = self.transport.lock().await;
            let _ = transport.send(JsonRpcMessage::Response(response)).await;
        }
    }
    async fn handle_error(&self, _error: TransportError) {}
    async fn handle_close(&self) {}
}

async fn spawn_target() -> InMemoryTransport {
    let (target_side, proxy_target_side) = InMemoryTransport::pair();
    let target_transport = Arc::new(TokioMutex::new(target_side));
    let mut guard = target_transport.lock().await;
    guard.set_message_handler(Arc::new(TargetDriver {
        transport: target_transport.clone(),
    }));
    guard.start().await.unwrap();
    drop(guard);
    proxy_target_side
}

fn base_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).unwrap()
}

#[tokio::test]
async fn a_500_from_a_remote_hook_still_lets_the_request_complete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/processListToolsRequest"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let proxy_target_side = spawn_target().await;
    let (client_side, server_side) = InMemoryTransport::pair();

    let chain = vec![HookConfig::Remote {
        name: "flaky-remote".to_string(),
        base_url: base_url(&server),
        methods: HookMethodSet::LIST_TOOLS_REQUEST,
    }];
    let context: PassthroughContext<InMemoryTransport, InMemoryTransport> =
        PassthroughContext::new("session-1", chain, OtherRequestPolicy::ForwardDirectly);
    context.connect(server_side, Some(proxy_target_side)).await.unwrap();

    let driver = ProtocolEndpoint::new(client_side).await.unwrap();
    driver.connect().await.unwrap();

    let response = driver.request(methods::TOOLS_LIST, None, None).await.unwrap();
    assert!(!response.is_error());
    assert_eq!(response.result.unwrap()["tools"], json!([{"name": "greet"}]));
}

#[tokio::test]
async fn an_unreachable_remote_hook_still_lets_the_request_complete() {
    let proxy_target_side = spawn_target().await;
    let (client_side, server_side) = InMemoryTransport::pair();

    let chain = vec![HookConfig::Remote {
        name: "unreachable".to_string(),
        base_url: Url::parse("http://127.0.0.1:1/").unwrap(),
        methods: HookMethodSet::LIST_TOOLS_REQUEST,
    }];
    let context: PassthroughContext<InMemoryTransport, InMemoryTransport> =
        PassthroughContext::new("session-1", chain, OtherRequestPolicy::ForwardDirectly);
    context.connect(server_side, Some(proxy_target_side)).await.unwrap();

    let driver = ProtocolEndpoint::new(client_side).await.unwrap();
    driver.connect().await.unwrap();

    let response = driver.request(methods::TOOLS_LIST, None, None).await.unwrap();
    assert!(!response.is_error());
}

#[tokio::test]
async fn a_remote_hooks_continue_payload_reaches_the_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/processListToolsRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "continue",
            "payload": {
                "jsonrpc": "2.0",
                "method": "tools/list",
                "params": {"filter": "visible"},
                "id": 1,
            }
        })))
        .mount(&server)
        .await;

    let proxy_target_side = spawn_target().await;
    let (client_side, server_side) = InMemoryTransport::pair();

    let chain = vec![HookConfig::Remote {
        name: "filterer".to_string(),
        base_url: base_url(&server),
        methods: HookMethodSet::LIST_TOOLS_REQUEST,
    }];
    let context: PassthroughContext<InMemoryTransport, InMemoryTransport> =
        PassthroughContext::new("session-1", chain, OtherRequestPolicy::ForwardDirectly);
    context.connect(server_side, Some(proxy_target_side)).await.unwrap();

    let driver = ProtocolEndpoint::new(client_side).await.unwrap();
    driver.connect().await.unwrap();

    let response = driver.request(methods::TOOLS_LIST, None, None).await.unwrap();
    assert!(!response.is_error());
    assert_eq!(response.result.unwrap()["tools"], json!([{"name": "greet"}]));
}
