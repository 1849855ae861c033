//! MCP Transport Trait Definitions
//!
//! Event-driven transport interface aligned with the official MCP
//! specification: a [`Transport`] delivers bytes and calls back into a
//! [`MessageHandler`] rather than exposing a blocking `receive()`. This is
//! a boundary-only contract — it carries exactly what [`crate::transport::ProtocolEndpoint`]
//! and [`crate::session::SessionManager`] drive every concrete transport
//! through, nothing a specific transport happens to also offer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::jsonrpc::JsonRpcMessage;

use super::{MessageContext, TransportError};

/// Event-driven message handler trait
///
/// Separates transport (message delivery) from protocol (MCP semantics):
/// a transport calls back into whatever handler it was given rather than
/// exposing a blocking `receive()`.
///
/// # Examples
///
/// ```rust
/// use mcp_passthrough_proxy::transport::mcp::{MessageHandler, MessageContext, TransportError};
/// use mcp_passthrough_proxy::jsonrpc::JsonRpcMessage;
/// use async_trait::async_trait;
///
/// struct EchoHandler;
///
/// #[async_trait]
/// impl MessageHandler for EchoHandler {
///     async fn handle_message(&self, message: JsonRpcMessage, context: MessageContext) {
///         println!("received at {}: {:?}", context.received_at(), message);
///     }
///
///     async fn handle_error(&self, error: TransportError) {
///         eprintln!("transport error: {}", error);
///     }
///
///     async fn handle_close(&self) {
///         println!("transport closed");
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle an incoming JSON-RPC message (request, response, or notification).
    async fn handle_message(&self, message: JsonRpcMessage, context: MessageContext);

    /// Handle a transport-level error that didn't produce a JSON-RPC message.
    async fn handle_error(&self, error: TransportError);

    /// Handle transport closure, graceful or not.
    async fn handle_close(&self);
}

/// Event-driven transport trait
///
/// The surface every concrete transport (stdio, in-memory, HTTP target,
/// [`crate::session::SessionTransport`]) implements and every driver
/// ([`crate::transport::ProtocolEndpoint`], `SessionManager`) consumes.
/// A transport that also tracks something extra internally (the HTTP
/// target transport's `Mcp-Session-Id` affinity, say) does so behind this
/// same four-method contract, not through additional trait surface.
///
/// # Examples
///
/// ```rust
/// use mcp_passthrough_proxy::transport::mcp::{Transport, MessageHandler, MessageContext, TransportError};
/// use mcp_passthrough_proxy::jsonrpc::{JsonRpcMessage, JsonRpcNotification};
/// use std::sync::Arc;
/// use async_trait::async_trait;
///
/// # struct MyHandler;
/// # #[async_trait]
/// # impl MessageHandler for MyHandler {
/// #     async fn handle_message(&self, message: JsonRpcMessage, context: MessageContext) {}
/// #     async fn handle_error(&self, error: TransportError) {}
/// #     async fn handle_close(&self) {}
/// # }
/// # struct MyTransport;
/// # impl MyTransport {
/// #     fn new() -> Self { Self }
/// # }
/// # #[async_trait]
/// # impl Transport for MyTransport {
/// #     type Error = TransportError;
/// #     async fn start(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// #     async fn close(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// #     async fn send(&mut self, message: JsonRpcMessage) -> Result<(), Self::Error> { Ok(()) }
/// #     fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {}
/// # }
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let handler = Arc::new(MyHandler);
///     let mut transport = MyTransport::new();
///
///     transport.set_message_handler(handler);
///     transport.start().await?;
///
///     let message = JsonRpcMessage::Notification(JsonRpcNotification::new("ping", None));
///     transport.send(message).await?;
///
///     transport.close().await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start the transport and begin delivering incoming messages to its handler.
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Close the transport and release its resources. Idempotent.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Send a JSON-RPC message through the transport.
    async fn send(&mut self, message: JsonRpcMessage) -> Result<(), Self::Error>;

    /// Set the handler the transport calls back into for incoming
    /// messages, transport errors, and closure.
    fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::JsonRpcNotification;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct MockHandler {
        messages: Arc<Mutex<Vec<JsonRpcMessage>>>,
    }

    #[async_trait]
    impl MessageHandler for MockHandler {
        async fn handle_message(&self, message: JsonRpcMessage, _context: MessageContext) {
            self.messages.lock().await.push(message);
        }

        async fn handle_error(&self, _error: TransportError) {}

        async fn handle_close(&self) {}
    }

    struct MockTransport {
        connected: bool,
        handler: Option<Arc<dyn MessageHandler>>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                connected: false,
                handler: None,
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        type Error = TransportError;

        async fn start(&mut self) -> Result<(), Self::Error> {
            self.connected = true;
            Ok(())
        }

        async fn close(&mut self) -> Result<(), Self::Error> {
            self.connected = false;
            if let Some(handler) = &self.handler {
                handler.handle_close().await;
            }
            Ok(())
        }

        async fn send(&mut self, _message: JsonRpcMessage) -> Result<(), Self::Error> {
            if !self.connected {
                return Err(TransportError::Closed);
            }
            Ok(())
        }

        fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
            self.handler = Some(handler);
        }
    }

    #[tokio::test]
    async fn start_send_close_drive_a_transport_through_its_lifecycle() {
        let mut transport = MockTransport::new();
        let handler = Arc::new(MockHandler {
            messages: Arc::new(Mutex::new(Vec::new())),
        });

        transport.set_message_handler(handler);
        transport.start().await.unwrap();

        let message = JsonRpcMessage::Notification(JsonRpcNotification::new("test", None));
        transport.send(message).await.unwrap();

        transport.close().await.unwrap();

        let message = JsonRpcMessage::Notification(JsonRpcNotification::new("test", None));
        assert!(transport.send(message).await.is_err());
    }
}
