//! JSON-RPC 2.0 Foundation
//!
//! Core message types shared by every endpoint, transport, and hook in the
//! crate. Everything here is wire-format only; protocol-level behavior
//! (correlation, dispatch, hooks) lives in sibling modules.

pub mod message;

pub use message::{
    methods, JsonRpcErrorObject, JsonRpcMessage, JsonRpcMessageExt, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId,
};
