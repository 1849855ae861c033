//! Core JSON-RPC 2.0 message types with proper trait abstraction
//!
//! This module implements the fundamental message structures defined by the
//! JSON-RPC 2.0 specification with shared serialization behavior through traits.
//! The proxy treats every message it forwards as one of these three shapes;
//! everything beyond `jsonrpc`/`method`/`params`/`id`/`result`/`error` is opaque
//! payload that passes through hooks untouched unless a hook chooses to edit it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trait for JSON-RPC message serialization and deserialization
///
/// Any type that implements `Serialize + Deserialize` automatically gets
/// the default implementations for JSON conversion methods.
///
/// # Examples
///
/// ```rust
/// use mcp_passthrough_proxy::jsonrpc::{JsonRpcMessageExt, JsonRpcRequest, RequestId};
///
/// let request = JsonRpcRequest::new("ping", None, RequestId::new_number(1));
/// let json = request.to_json().unwrap();
/// let parsed = JsonRpcRequest::from_json(&json).unwrap();
///
/// assert_eq!(request, parsed);
/// ```
pub trait JsonRpcMessageExt: Serialize + for<'de> Deserialize<'de> + Sized {
    /// Serialize this message to JSON string
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a message from JSON string
    fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Deserialize a message from JSON bytes
    fn from_json_bytes(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }
}

/// Request ID supporting both string and numeric formats per JSON-RPC 2.0
///
/// The spec allows request ids to be strings or numbers. This proxy never
/// mints a null id on the request path; a `None` id is only legal on the
/// response path, for parse errors that occurred before an id was known.
///
/// # Examples
///
/// ```rust
/// use mcp_passthrough_proxy::jsonrpc::RequestId;
///
/// let string_id = RequestId::String("req-123".to_string());
/// let numeric_id = RequestId::Number(42);
///
/// assert_eq!(serde_json::to_string(&string_id).unwrap(), r#""req-123""#);
/// assert_eq!(serde_json::to_string(&numeric_id).unwrap(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String-based request identifier
    String(String),
    /// Numeric request identifier
    Number(i64),
}

impl RequestId {
    /// Create a new string-based request ID
    pub fn new_string(id: impl Into<String>) -> Self {
        RequestId::String(id.into())
    }

    /// Create a new numeric request ID
    pub fn new_number(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// JSON-RPC 2.0 error object, embedded in `JsonRpcResponse::error`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorObject {
    /// Numeric error code (see [`crate::error::ProxyError::json_rpc_code`])
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional structured error detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    /// Build an error object with no extra data payload
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured data to the error object
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// JSON-RPC 2.0 Request Message
///
/// - `jsonrpc`: MUST be exactly "2.0"
/// - `method`: MUST be a String containing the name of the method to invoke
/// - `params`: MAY be omitted
/// - `id`: MUST be a String or Number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Protocol version - always "2.0"
    pub jsonrpc: String,
    /// Name of the method to invoke
    pub method: String,
    /// Parameters for the method (object or array)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Unique identifier for this request
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Read the `params` object's `_meta` field, if present
    pub fn meta(&self) -> Option<&Value> {
        self.params.as_ref()?.as_object()?.get("_meta")
    }

    /// Merge `fields` into `params._meta`, creating `params`/`_meta` as needed
    pub fn merge_meta(&mut self, fields: Value) {
        let params = self
            .params
            .get_or_insert_with(|| Value::Object(Default::default()));
        let params_obj = params
            .as_object_mut()
            .expect("params is always constructed as an object when meta is merged");
        let meta = params_obj
            .entry("_meta")
            .or_insert_with(|| Value::Object(Default::default()));
        if let (Some(meta_obj), Some(fields_obj)) = (meta.as_object_mut(), fields.as_object()) {
            for (k, v) in fields_obj {
                meta_obj.insert(k.clone(), v.clone());
            }
        }
    }
}

impl JsonRpcMessageExt for JsonRpcRequest {}

/// JSON-RPC 2.0 Response Message
///
/// Contains either a successful `result` or an `error`, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Protocol version - always "2.0"
    pub jsonrpc: String,
    /// Result of successful method invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information for failed method invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
    /// Request identifier from the original request (null for parse errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    /// Create a successful JSON-RPC 2.0 response
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    /// Create an error JSON-RPC 2.0 response
    pub fn error(error: JsonRpcErrorObject, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Whether this response carries an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Read the `result._meta` field, if present
    pub fn meta(&self) -> Option<&Value> {
        self.result.as_ref()?.as_object()?.get("_meta")
    }

    /// Merge `fields` into `result._meta`, creating `result`/`_meta` as needed.
    /// No-op on error responses: an error object has no `_meta` slot.
    pub fn merge_meta(&mut self, fields: Value) {
        let Some(result) = self.result.as_mut() else {
            return;
        };
        if !result.is_object() {
            *result = Value::Object(Default::default());
        }
        let result_obj = result.as_object_mut().expect("checked above");
        let meta = result_obj
            .entry("_meta")
            .or_insert_with(|| Value::Object(Default::default()));
        if let (Some(meta_obj), Some(fields_obj)) = (meta.as_object_mut(), fields.as_object()) {
            for (k, v) in fields_obj {
                meta_obj.insert(k.clone(), v.clone());
            }
        }
    }
}

impl JsonRpcMessageExt for JsonRpcResponse {}

/// JSON-RPC 2.0 Notification Message
///
/// A request that does not expect a response. Distinguished from a request
/// by the absence of an `id` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    /// Protocol version - always "2.0"
    pub jsonrpc: String,
    /// Name of the notification method
    pub method: String,
    /// Parameters for the notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC 2.0 notification
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcMessageExt for JsonRpcNotification {}

/// Any inbound JSON-RPC message, before it's known which variant it is.
///
/// The `Transport` contract delivers raw bytes; this is the first thing a
/// [`crate::transport::ProtocolEndpoint`] parses a frame into, classifying it
/// by presence/absence of `method` and `id` the way every JSON-RPC 2.0
/// implementation in this corpus does: `method` present = request or
/// notification, `id` present alongside it = request, `id` absent = response
/// or error (which instead carries `result`/`error`).
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    /// An inbound or outbound request expecting a response
    Request(JsonRpcRequest),
    /// A response (success or error) correlated to a prior request
    Response(JsonRpcResponse),
    /// A one-way notification
    Notification(JsonRpcNotification),
}

impl JsonRpcMessage {
    /// Parse a raw JSON-RPC frame, classifying it by shape
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Classify an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let has_method = value.get("method").is_some();
        let has_id = value.get("id").is_some();
        if has_method && has_id {
            Ok(Self::Request(serde_json::from_value(value)?))
        } else if has_method {
            Ok(Self::Notification(serde_json::from_value(value)?))
        } else {
            Ok(Self::Response(serde_json::from_value(value)?))
        }
    }

    /// Serialize back to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Request(r) => serde_json::to_string(r),
            Self::Response(r) => serde_json::to_string(r),
            Self::Notification(n) => serde_json::to_string(n),
        }
    }

    /// The method name, for requests and notifications; `None` for responses
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }
}

/// Well-known MCP method names the core dispatches on directly.
///
/// Everything else falls into the `other` bucket of
/// [`crate::context::PassthroughContext`]'s dispatch table.
pub mod methods {
    /// Capability negotiation handshake
    pub const INITIALIZE: &str = "initialize";
    /// Client → server tool catalog listing
    pub const TOOLS_LIST: &str = "tools/list";
    /// Client → server tool invocation
    pub const TOOLS_CALL: &str = "tools/call";
    /// Client → server handshake completion notice
    pub const NOTIFICATIONS_INITIALIZED: &str = "notifications/initialized";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_round_trips() {
        let request = JsonRpcRequest::new(
            "subtract",
            Some(json!([42, 23])),
            RequestId::new_number(1),
        );
        let json = request.to_json().unwrap();
        let parsed = JsonRpcRequest::from_json(&json).unwrap();
        assert_eq!(request, parsed);
    }

    #[test]
    fn notification_has_no_id_field() {
        let notification = JsonRpcNotification::new("status", Some(json!({"ready": true})));
        let json = notification.to_json().unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn envelope_classifies_by_shape() {
        let req = r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#;
        let notif = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let resp = r#"{"jsonrpc":"2.0","result":{},"id":1}"#;

        assert!(matches!(
            JsonRpcMessage::from_json(req).unwrap(),
            JsonRpcMessage::Request(_)
        ));
        assert!(matches!(
            JsonRpcMessage::from_json(notif).unwrap(),
            JsonRpcMessage::Notification(_)
        ));
        assert!(matches!(
            JsonRpcMessage::from_json(resp).unwrap(),
            JsonRpcMessage::Response(_)
        ));
    }

    #[test]
    fn request_meta_merges_without_clobbering_existing_fields() {
        let mut request = JsonRpcRequest::new(
            "tools/call",
            Some(json!({"name": "echo", "_meta": {"existing": "keep"}})),
            RequestId::new_number(1),
        );
        request.merge_meta(json!({"sessionId": "abc"}));

        let meta = request.meta().unwrap();
        assert_eq!(meta["existing"], json!("keep"));
        assert_eq!(meta["sessionId"], json!("abc"));
    }

    #[test]
    fn response_meta_merge_is_noop_on_error() {
        let mut response = JsonRpcResponse::error(
            JsonRpcErrorObject::new(-32001, "rejected"),
            Some(RequestId::new_number(1)),
        );
        response.merge_meta(json!({"sessionId": "abc"}));
        assert!(response.meta().is_none());
    }
}
