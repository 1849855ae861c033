//! Transport implementations (C1) and the protocol endpoint (C2) built on top.
//!
//! - [`mcp`] — the event-driven `Transport`/`MessageHandler` contract
//! - [`endpoint`] — [`ProtocolEndpoint`], correlation + per-method dispatch
//! - [`in_memory`] — a channel-backed test double
//! - [`stdio`] — newline-delimited JSON-RPC over stdin/stdout
//! - [`http`] — the target-facing HTTP client and the proxy's HTTP front

pub mod endpoint;
pub mod http;
pub mod in_memory;
pub mod mcp;
pub mod stdio;

pub use endpoint::{ClientEndpoint, EndpointError, NotificationHandler, ProtocolEndpoint, RequestHandler, ServerEndpoint};
pub use http::{HttpClientTransport, TargetTransportMode};
pub use in_memory::InMemoryTransport;
pub use stdio::StdioTransport;
