//! # Dispatcher Module
//!
//! Runs the handler chain of a resolved route for one request.
//!
//! ## Request Flow
//!
//! 1. The host hands a [`Request`] to [`Dispatcher::dispatch`]
//! 2. The query string is split off and the path resolved against the live router
//! 3. A [`RequestContext`] is built with the bound parameters and a cancel token
//! 4. [`Chain::advance`] runs the first handler; each handler decides whether
//!    to continue
//! 5. The response left in the context is returned
//!
//! ## Error Handling
//!
//! The dispatcher does not swallow or log handler failures:
//! - Routing misses come back as [`DispatchError::NotFound`] or
//!   [`DispatchError::MethodNotAllowed`]
//! - Handler errors come back as [`DispatchError::Handler`] unless a
//!   recovery middleware converted them
//! - Panics unwind to the caller unless a recovery middleware caught them
//!
//! [`Dispatcher::handle`] maps every error to its HTTP response for hosts that
//! just want something to send.

mod cancel;
mod chain;
mod context;
mod core;

pub use cancel::CancelToken;
pub use chain::{
    endpoint, from_fn, Chain, ChainState, Endpoint, Handler, HandlerChain, HandlerError,
    HandlerResult,
};
pub use context::{parse_query, RequestContext};
pub use core::{
    DispatchError, Dispatcher, HandlerResponse, HeaderVec, Request, MAX_INLINE_HEADERS,
};
