//! In-memory transport
//!
//! A test double: two [`InMemoryTransport`]s built via [`InMemoryTransport::pair`]
//! are wired directly to each other's handler through unbounded channels, with
//! no serialization round-trip. Used by [`crate::context::PassthroughContext`]
//! tests and anywhere exercising hook/endpoint behavior without a real socket.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::jsonrpc::JsonRpcMessage;

use super::mcp::{MessageContext, MessageHandler, Transport, TransportError};

/// One end of an in-process pair of transports.
pub struct InMemoryTransport {
    outbound: mpsc::UnboundedSender<JsonRpcMessage>,
    inbound: Option<mpsc::UnboundedReceiver<JsonRpcMessage>>,
    handler: Option<Arc<dyn MessageHandler>>,
    read_loop: Option<JoinHandle<()>>,
    connected: bool,
}

impl InMemoryTransport {
    /// Build two transports, each other's peer: messages sent on one arrive
    /// as `handle_message` calls on the other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        (
            Self {
                outbound: tx_b,
                inbound: Some(rx_a),
                handler: None,
                read_loop: None,
                connected: false,
            },
            Self {
                outbound: tx_a,
                inbound: Some(rx_b),
                handler: None,
                read_loop: None,
                connected: false,
            },
        )
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    type Error = TransportError;

    async fn start(&mut self) -> Result<(), Self::Error> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| TransportError::connection("no message handler set"))?;
        let mut inbound = self
            .inbound
            .take()
            .ok_or_else(|| TransportError::connection("transport already started"))?;

        self.read_loop = Some(tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                handler
                    .handle_message(message, MessageContext::now())
                    .await;
            }
            handler.handle_close().await;
        }));
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if let Some(handle) = self.read_loop.take() {
            handle.abort();
        }
        self.connected = false;
        Ok(())
    }

    async fn send(&mut self, message: JsonRpcMessage) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(message)
            .map_err(|_| TransportError::connection("peer transport dropped"))
    }

    fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        self.handler = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, RequestId};
    use std::sync::Mutex as StdMutex;

    struct CollectingHandler {
        received: Arc<StdMutex<Vec<JsonRpcMessage>>>,
    }

    #[async_trait]
    impl MessageHandler for CollectingHandler {
        async fn handle_message(&self, message: JsonRpcMessage, _context: MessageContext) {
            self.received.lock().unwrap().push(message);
        }
        async fn handle_error(&self, _error: TransportError) {}
        async fn handle_close(&self) {}
    }

    #[tokio::test]
    async fn messages_sent_on_one_side_arrive_on_the_other() {
        let (mut a, mut b) = InMemoryTransport::pair();
        let received = Arc::new(StdMutex::new(Vec::new()));
        b.set_message_handler(Arc::new(CollectingHandler {
            received: received.clone(),
        }));
        a.set_message_handler(Arc::new(CollectingHandler {
            received: Arc::new(StdMutex::new(Vec::new())),
        }));
        b.start().await.unwrap();
        a.start().await.unwrap();

        let request = JsonRpcRequest::new("ping", None, RequestId::new_number(1));
        a.send(JsonRpcMessage::Request(request.clone())).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], JsonRpcMessage::Request(request));
    }

    #[tokio::test]
    async fn send_before_start_fails_closed() {
        let (mut a, _b) = InMemoryTransport::pair();
        let notification = JsonRpcNotification::new("ping", None);
        let err = a
            .send(JsonRpcMessage::Notification(notification))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
