//! Hook chain: contract, construction, and the processor that drives a
//! message through it.
//!
//! - [`contract`] — the [`Hook`] trait and the result types it returns
//! - [`chain`] — [`HookChain`], the ordered, immutable-after-construction
//!   sequence of hooks a [`crate::context::PassthroughContext`] builds once
//! - [`processor`] — the forward/reverse traversal functions
//! - [`local`] / [`remote`] — the two kinds of hook a chain can hold
//! - [`router`] — serves a local hook over HTTP for a remote proxy to call

pub mod chain;
pub mod contract;
pub mod local;
pub mod processor;
pub mod remote;
pub mod router;

pub use chain::{HookChain, Node};
pub use contract::{Hook, HookError, HookMethodSet, HookResult, RequestContext, ResponseHookResult};
pub use local::LocalHookClient;
pub use processor::{
    process_request_through_hooks, process_response_through_hooks, RequestHookCall, RequestOutcome,
    ResponseHookCall, ResponseOutcome,
};
pub use remote::RemoteHookClient;
pub use router::HookRouter;
