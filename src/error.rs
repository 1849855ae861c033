//! Crate-wide error taxonomy
//!
//! Every fallible operation in the proxy eventually resolves to a
//! [`ProxyError`], which carries enough structure to become either a
//! JSON-RPC error object or an HTTP response.

use serde_json::Value;
use thiserror::Error;

use crate::jsonrpc::{JsonRpcErrorObject, JsonRpcResponse, RequestId};

/// Stable error codes surfaced to the client, per the error taxonomy table.
pub mod codes {
    /// Malformed JSON on an MCP endpoint
    pub const PARSE_ERROR: i32 = -32700;
    /// Missing session id when one was required, unsupported initialize version
    pub const BAD_REQUEST: i32 = -32000;
    /// Hook returned `abort` on the request path, or no client transport available
    pub const REQUEST_REJECTED: i32 = -32001;
    /// Hook returned `abort` on the response path; unhandled internal fault
    pub const RESPONSE_REJECTED: i32 = -32603;
}

/// Top-level proxy error
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Inbound JSON on an MCP endpoint failed to parse
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A precondition for dispatch was missing (session header, initialize shape)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A request-path hook aborted, or no client transport is attached
    #[error("request rejected: {0}")]
    RequestRejected(String),

    /// A response-path hook aborted
    #[error("response rejected: {0}")]
    ResponseRejected(String),

    /// An internal fault not attributable to a hook decision
    #[error("internal error: {0}")]
    Internal(String),

    /// The target transport failed; carries enough detail to reconstruct a reply
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::mcp::TransportError),
}

impl ProxyError {
    /// The stable JSON-RPC error code for this failure
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            ProxyError::Parse(_) => codes::PARSE_ERROR,
            ProxyError::BadRequest(_) => codes::BAD_REQUEST,
            ProxyError::RequestRejected(_) => codes::REQUEST_REJECTED,
            ProxyError::ResponseRejected(_) => codes::RESPONSE_REJECTED,
            ProxyError::Internal(_) => codes::RESPONSE_REJECTED,
            ProxyError::Transport(_) => codes::RESPONSE_REJECTED,
        }
    }

    /// Build the JSON-RPC error response a client should see for this failure
    pub fn into_response(self, id: Option<RequestId>, data: Option<Value>) -> JsonRpcResponse {
        let code = self.json_rpc_code();
        let mut error = JsonRpcErrorObject::new(code, self.to_string());
        if let Some(data) = data {
            error = error.with_data(data);
        }
        JsonRpcResponse::error(error, id)
    }
}

impl From<ProxyError> for JsonRpcResponse {
    fn from(err: ProxyError) -> Self {
        err.into_response(None, None)
    }
}
