//! mcp-passthrough-proxy
//!
//! A transparent passthrough proxy for the Model Context Protocol. Every
//! request a client sends is forwarded to a configured target MCP server
//! and the reply is forwarded back unchanged, except for whatever an
//! operator-configured chain of hooks chooses to observe, rewrite,
//! short-circuit, or reject along the way.
//!
//! # Architecture
//!
//! - [`jsonrpc`]: the wire-format envelope (`JsonRpcRequest`/`JsonRpcResponse`/
//!   `JsonRpcNotification`) shared by every other module
//! - [`transport`]: the event-driven `Transport`/`MessageHandler` contract,
//!   the `ProtocolEndpoint` built on top of it (which also matches an
//!   outbound request to its eventual reply), and the concrete transports
//!   (stdio, in-memory, HTTP)
//! - [`hooks`]: the `Hook` trait, the `HookChain` that orders them, and the
//!   forward/reverse traversal functions that drive a message through it
//! - [`context`]: `PassthroughContext`, the engine that actually forwards
//!   traffic between a client-facing and a target-facing endpoint through
//!   the hook chain
//! - [`session`]: `SessionManager`, multiplexing many `PassthroughContext`s
//!   behind one HTTP listener, one per `Mcp-Session-Id`
//! - [`config`]: environment/CLI configuration for the binary front
//! - [`error`]: the crate-wide error taxonomy
//!
//! ## Quick Start
//!
//! ```rust
//! use mcp_passthrough_proxy::jsonrpc::{JsonRpcRequest, JsonRpcMessageExt, RequestId};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(
//!     "tools/list",
//!     Some(json!({})),
//!     RequestId::new_string("req-001"),
//! );
//!
//! let json = request.to_json().unwrap();
//! let parsed = JsonRpcRequest::from_json(&json).unwrap();
//! assert_eq!(request, parsed);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod jsonrpc;
pub mod session;
pub mod transport;

pub use config::ProxyConfig;
pub use context::{HookConfig, OtherRequestPolicy, PassthroughContext};
pub use error::ProxyError;
pub use hooks::{Hook, HookChain, HookError, HookMethodSet, HookResult, Node, RequestContext, ResponseHookResult};
pub use jsonrpc::{
    methods, JsonRpcErrorObject, JsonRpcMessage, JsonRpcMessageExt, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};
pub use session::SessionManager;
pub use transport::{
    ClientEndpoint, EndpointError, HttpClientTransport, InMemoryTransport, ProtocolEndpoint, ServerEndpoint,
    StdioTransport, TargetTransportMode,
};

/// Crate version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn core_message_types_are_reachable_from_the_crate_root() {
        let request = JsonRpcRequest::new(
            "test_method",
            Some(json!({"param": "value"})),
            RequestId::new_string("test-123"),
        );
        let response = JsonRpcResponse::success(json!({"result": "success"}), RequestId::new_number(456));
        let notification = JsonRpcNotification::new("test_event", Some(json!({"event": "occurred"})));

        assert!(request.to_json().is_ok());
        assert!(response.to_json().is_ok());
        assert!(notification.to_json().is_ok());
    }

    #[test]
    fn version_is_populated_from_cargo_metadata() {
        assert!(!VERSION.is_empty());
    }
}
