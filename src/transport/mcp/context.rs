//! Message Context
//!
//! A per-message timestamp handed to [`super::MessageHandler::handle_message`]
//! alongside the message itself. Every transport in this crate is
//! single-session (stdio's one peer, an in-memory pair, one HTTP target
//! connection) or, for [`crate::session::SessionTransport`], dispatches
//! through a session id already carried in the request/response pair rather
//! than through this context — so there is nothing session-scoped left for
//! it to carry.

use chrono::{DateTime, Utc};

/// When a message was handed to a [`super::MessageHandler`].
#[derive(Debug, Clone, Copy)]
pub struct MessageContext {
    received_at: DateTime<Utc>,
}

impl MessageContext {
    /// Stamp a context with the current time.
    pub fn now() -> Self {
        Self { received_at: Utc::now() }
    }

    /// When the message was received.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl Default for MessageContext {
    fn default() -> Self {
        Self::now()
    }
}
