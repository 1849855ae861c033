//! MCP-Compliant Transport Layer
//!
//! Event-driven transport abstraction aligned with the official Model Context
//! Protocol SDKs: a [`Transport`] delivers bytes and calls back into a
//! [`MessageHandler`] rather than exposing a blocking `receive()`.
//!
//! # Architecture
//!
//! - **[`crate::jsonrpc::JsonRpcMessage`]**: wire-format envelope, shared with
//!   every other module in the crate
//! - **[`MessageHandler`]**: event-driven protocol logic (separation of concerns)
//! - **[`Transport`]**: event-driven transport interface
//! - **[`MessageContext`]**: when a message was received
//!
//! # Design Philosophy
//!
//! - **Event-Driven**: Uses callbacks instead of blocking receive() operations
//! - **Specification-Aligned**: Matches official MCP SDK patterns
//! - **Clean Separation**: Transport handles delivery, MessageHandler handles protocol
//! - **Natural Correlation**: Uses JSON-RPC message IDs, no artificial mechanisms
//! - **Boundary-Only**: the trait carries only what its drivers actually call
//!
//! # Examples
//!
//! ```rust
//! use mcp_passthrough_proxy::transport::mcp::{Transport, MessageHandler, MessageContext, TransportError};
//! use mcp_passthrough_proxy::jsonrpc::JsonRpcMessage;
//! use std::sync::Arc;
//! use async_trait::async_trait;
//!
//! # struct MyHandler;
//! # #[async_trait]
//! # impl MessageHandler for MyHandler {
//! #     async fn handle_message(&self, message: JsonRpcMessage, context: MessageContext) {}
//! #     async fn handle_error(&self, error: TransportError) {}
//! #     async fn handle_close(&self) {}
//! # }
//! # struct MyTransport;
//! # impl MyTransport {
//! #     fn new() -> Self { Self }
//! # }
//! # #[async_trait]
//! # impl Transport for MyTransport {
//! #     type Error = TransportError;
//! #     async fn start(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     async fn close(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     async fn send(&mut self, message: JsonRpcMessage) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {}
//! # }
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = Arc::new(MyHandler);
//!     let mut transport = MyTransport::new();
//!
//!     transport.set_message_handler(handler);
//!     transport.start().await?;
//!     transport.close().await?;
//!
//!     Ok(())
//! }
//! ```

pub use context::MessageContext;
pub use error::{ResponseType, TransportError};
pub use transport::{MessageHandler, Transport};

mod context;
mod error;
mod transport;
