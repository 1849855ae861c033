//! STDIO Transport
//!
//! Newline-delimited JSON-RPC over stdin/stdout — the transport a `--stdio`
//! front speaks to its single local peer. Logging from this process must
//! never touch stdout (see `main.rs`'s `tracing_subscriber` setup): a stray
//! log line there would corrupt the frame the peer is trying to parse.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::jsonrpc::JsonRpcMessage;

use super::mcp::{MessageContext, MessageHandler, Transport, TransportError};

/// Newline-delimited JSON-RPC transport over the process's stdin/stdout.
pub struct StdioTransport {
    stdin_reader: Arc<Mutex<BufReader<Stdin>>>,
    stdout: Arc<Mutex<Stdout>>,
    handler: Option<Arc<dyn MessageHandler>>,
    read_loop: Option<JoinHandle<()>>,
    connected: bool,
}

impl StdioTransport {
    /// Build a transport over the current process's stdin/stdout.
    pub fn new() -> Self {
        Self {
            stdin_reader: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
            stdout: Arc::new(Mutex::new(tokio::io::stdout())),
            handler: None,
            read_loop: None,
            connected: false,
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_loop(
    stdin_reader: Arc<Mutex<BufReader<Stdin>>>,
    handler: Arc<dyn MessageHandler>,
) {
    loop {
        let mut line = String::new();
        let bytes_read = {
            let mut reader = stdin_reader.lock().await;
            reader.read_line(&mut line).await
        };

        match bytes_read {
            Ok(0) => {
                handler.handle_close().await;
                return;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match JsonRpcMessage::from_json(trimmed) {
                    Ok(message) => {
                        handler.handle_message(message, MessageContext::now()).await;
                    }
                    Err(err) => {
                        handler
                            .handle_error(TransportError::from(err))
                            .await;
                    }
                }
            }
            Err(err) => {
                warn!(%err, "stdin read failed");
                handler.handle_error(TransportError::from(err)).await;
                handler.handle_close().await;
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    type Error = TransportError;

    async fn start(&mut self) -> Result<(), Self::Error> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| TransportError::connection("no message handler set"))?;

        let stdin_reader = self.stdin_reader.clone();
        self.read_loop = Some(tokio::spawn(read_loop(stdin_reader, handler)));
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
        let mut line = message.to_json()?;
        line.push('\n');
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    fn set_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        self.handler = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_before_start_fails_closed() {
        let mut transport = StdioTransport::new();
        let notification = JsonRpcMessage::Notification(crate::jsonrpc::JsonRpcNotification::new("ping", None));
        let err = transport.send(notification).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
