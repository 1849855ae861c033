//! The target-facing HTTP client and the proxy's own HTTP front.
//!
//! - [`client`] — [`client::HttpClientTransport`], speaks to the configured
//!   target MCP server
//! - [`front`] — the `axum::Router` a [`crate::session::SessionManager`]
//!   serves to MCP clients

pub mod client;
pub mod front;

pub use client::{HttpClientTransport, TargetTransportMode};
pub use front::build_router;
