//! Transport Error Types
//!
//! Error types for transport-level operations, separate from JSON-RPC protocol errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which surface a target-reported failure arrived on.
///
/// An HTTP target can fail with a raw status code and body before any
/// JSON-RPC envelope exists; a stdio/in-memory target always fails inside
/// a JSON-RPC error object. `process*TransportError` hooks and the stdio
/// front's `-32603` coercion both key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// The target failed at the HTTP layer (4xx/5xx status)
    Http,
    /// The target failed inside a JSON-RPC error object
    JsonRpc,
}

/// Transport-level error types
///
/// These errors represent transport layer failures, separate from
/// JSON-RPC protocol errors that are part of the message format.
///
/// `Clone` is required so a transport error can be handed to a
/// `process*TransportError` hook and still be available to fall back on if
/// that hook fails (see [`crate::hooks::processor`]); the nested standard
/// library error types aren't `Clone`, so they're captured as formatted
/// strings rather than kept as `#[from]` sources.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum TransportError {
    /// Connection failed or was lost
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Message serialization/deserialization failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// I/O error during transport operations
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Transport was closed
    #[error("Transport is closed")]
    Closed,

    /// Transport-specific error
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Timeout during operation
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The target server reported a failure for an in-flight request
    ///
    /// Fed into `process*TransportError` hooks; `response_type` decides
    /// how it gets coerced back into a reply to the client (spec.md §4.9,
    /// §9 Open Question on stdio HTTP-status coercion).
    #[error("target error (code {code}): {message}")]
    Target {
        /// Status code (HTTP status, or the JSON-RPC error code)
        code: i32,
        /// Human-readable detail
        message: String,
        /// Raw body/data accompanying the failure
        data: Option<Value>,
        /// Which surface the failure arrived on
        response_type: ResponseType,
    },
}

impl TransportError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a transport-specific error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a target-reported failure
    pub fn target(
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
        response_type: ResponseType,
    ) -> Self {
        Self::Target {
            code,
            message: message.into(),
            data,
            response_type,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization {
            message: source.to_string(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
        }
    }
}
