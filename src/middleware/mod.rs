//! Middleware shipped with the dispatch core.
//!
//! Each middleware is an ordinary [`Handler`](crate::dispatcher::Handler)
//! that calls `chain.advance(ctx)` and works on the context before and after
//! the call. Install [`RecoveryMiddleware`] first so its fault boundary covers
//! the others.

mod metrics;
mod recovery;
mod request_id;
mod tracing;

pub use metrics::MetricsMiddleware;
pub use recovery::{panic_message, RecoveryMiddleware};
pub use request_id::RequestIdMiddleware;
pub use tracing::TracingMiddleware;
