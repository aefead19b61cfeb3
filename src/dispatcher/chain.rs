//! Handler contract and the per-request chain cursor.
//!
//! A route's handler chain is an ordered slice `h0..hn` (global middleware,
//! group middleware, then the route handler). Each handler receives the
//! request context and the [`Chain`] cursor and decides what happens next:
//!
//! - return without calling [`Chain::advance`]: the chain short-circuits and
//!   no later handler runs;
//! - call `chain.advance(ctx)`: every downstream handler runs synchronously
//!   inside that call, then control comes back so the handler can inspect or
//!   rewrite the response on the way out.
//!
//! ```text
//!   advance ─► h0 ─► advance ─► h1 ─► advance ─► h2
//!              h0 ◄─ return ─── h1 ◄─ return ─── h2
//! ```
//!
//! The cursor only moves forward. Once the chain is completed (end reached,
//! a handler declined to advance, a handler failed, or the request was
//! cancelled) further `advance` calls are no-ops, so a second call never
//! re-runs handlers that already ran.

use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use super::context::RequestContext;
use super::core::HandlerResponse;
use crate::router::ParamError;

/// Result returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Shared, immutable handler chain stored on a route.
pub type HandlerChain = Arc<[Arc<dyn Handler>]>;

/// A handler or middleware in a route's chain.
///
/// Middleware and endpoints implement the same trait; an endpoint is simply
/// a handler that never calls [`Chain::advance`].
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext, chain: &mut Chain<'_>) -> HandlerResult;

    /// Name used in logs and route dumps.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext, &mut Chain<'_>) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext, chain: &mut Chain<'_>) -> HandlerResult {
        self(ctx, chain)
    }
}

/// Build a middleware from a closure that receives the chain cursor.
///
/// # Example
///
/// ```rust
/// use brrtrouter_dispatch::dispatcher::from_fn;
///
/// let stamp = from_fn(|ctx, chain| {
///     chain.advance(ctx)?;
///     ctx.response.set_header("x-served-by", "brrtrouter".to_string());
///     Ok(())
/// });
/// # let _ = stamp;
/// ```
pub fn from_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&mut RequestContext, &mut Chain<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Terminal handler that never advances the chain.
pub struct Endpoint<F> {
    name: String,
    f: F,
}

impl<F> Handler for Endpoint<F>
where
    F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext, _chain: &mut Chain<'_>) -> HandlerResult {
        (self.f)(ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a route handler from a closure over the request context.
pub fn endpoint<F>(name: &str, f: F) -> Arc<dyn Handler>
where
    F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(Endpoint {
        name: name.to_string(),
        f,
    })
}

/// Error raised by a handler.
///
/// Errors travel outward through the chain exactly like return values: each
/// upstream middleware sees it come back from `advance` and may convert it
/// into a response (see [`RecoveryMiddleware`](crate::middleware::RecoveryMiddleware))
/// or let it propagate to the dispatcher.
#[derive(Debug)]
pub enum HandlerError {
    /// Abort with a specific HTTP status.
    Status { status: u16, message: String },
    /// A required path parameter was not bound.
    Param(ParamError),
    /// Anything else; reported as 500.
    Internal(anyhow::Error),
}

impl HandlerError {
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        HandlerError::Status {
            status,
            message: message.into(),
        }
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::Status { status, .. } => *status,
            HandlerError::Param(_) => 400,
            HandlerError::Internal(_) => 500,
        }
    }

    /// Convert into the error response a recovery boundary would send.
    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        let status = self.status_code();
        match self {
            HandlerError::Internal(_) => HandlerResponse::error(status, "Internal Server Error"),
            other => HandlerResponse::error(status, &other.to_string()),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Status { message, .. } => write!(f, "{message}"),
            HandlerError::Param(err) => write!(f, "{err}"),
            HandlerError::Internal(err) => write!(f, "internal handler error: {err}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Param(err) => Some(err),
            HandlerError::Internal(err) => Some(err.as_ref()),
            HandlerError::Status { .. } => None,
        }
    }
}

impl From<ParamError> for HandlerError {
    fn from(err: ParamError) -> Self {
        HandlerError::Param(err)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Internal(err)
    }
}

/// Lifecycle of one chain execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Nothing has run yet.
    Pending,
    /// A handler is executing.
    Running,
    /// No further handler will run.
    Completed,
}

/// Cursor over a handler chain for a single request.
///
/// Not shared between requests and not reentrant across threads; the
/// dispatcher creates one per request.
pub struct Chain<'a> {
    handlers: &'a [Arc<dyn Handler>],
    cursor: usize,
    state: ChainState,
}

impl<'a> Chain<'a> {
    #[must_use]
    pub fn new(handlers: &'a [Arc<dyn Handler>]) -> Self {
        Self {
            handlers,
            cursor: 0,
            state: ChainState::Pending,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Index of the next handler to invoke.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == ChainState::Completed
    }

    /// Handlers that have not been invoked yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.handlers.len() - self.cursor
    }

    /// Mark the chain completed without running anything else.
    ///
    /// Used by recovery boundaries after catching a panic that unwound
    /// through `advance`.
    pub fn complete(&mut self) {
        self.state = ChainState::Completed;
    }

    /// Invoke the next handler and return once it (and everything it
    /// advanced into) has finished.
    ///
    /// No-op when the chain is completed or exhausted. When the request's
    /// cancel token has fired and handlers remain, they are skipped and a 503
    /// timeout response is written instead.
    ///
    /// Calling this more than once from the same handler is allowed; only the
    /// first call can run anything, because the first call always leaves the
    /// chain completed.
    pub fn advance(&mut self, ctx: &mut RequestContext) -> HandlerResult {
        if self.state == ChainState::Completed {
            trace!(
                request_id = %ctx.request_id,
                position = self.cursor,
                "Advance after completion ignored"
            );
            return Ok(());
        }

        let handlers = self.handlers;
        let index = self.cursor;
        let Some(handler) = handlers.get(index) else {
            self.state = ChainState::Completed;
            return Ok(());
        };

        if ctx.is_cancelled() {
            warn!(
                request_id = %ctx.request_id,
                pattern = %ctx.pattern,
                skipped_handlers = self.remaining(),
                elapsed_ms = ctx.elapsed().as_millis() as u64,
                "Request cancelled - skipping remaining handlers"
            );
            self.state = ChainState::Completed;
            ctx.response = HandlerResponse::error(503, "Request timed out");
            return Ok(());
        }

        self.cursor += 1;
        self.state = ChainState::Running;
        trace!(
            request_id = %ctx.request_id,
            position = index,
            handler = handler.name(),
            "Invoking handler"
        );

        let result = handler.handle(ctx, self);

        // A handler that returned without advancing ends the chain; so does a failure.
        if result.is_err() || self.cursor == index + 1 {
            self.state = ChainState::Completed;
        }
        result
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.handlers.len())
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::CancelToken;
    use http::Method;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn wrap(log: &Log, name: &'static str) -> Arc<dyn Handler> {
        let log = Arc::clone(log);
        from_fn(move |ctx, chain| {
            log.lock().push(format!("before-{name}"));
            chain.advance(ctx)?;
            log.lock().push(format!("after-{name}"));
            Ok(())
        })
    }

    fn stop(log: &Log, name: &'static str) -> Arc<dyn Handler> {
        let log = Arc::clone(log);
        from_fn(move |_ctx, _chain| {
            log.lock().push(name.to_string());
            Ok(())
        })
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET, "/test")
    }

    #[test]
    fn test_before_after_nesting() {
        let log: Log = Arc::default();
        let handlers = vec![wrap(&log, "A"), wrap(&log, "B"), wrap(&log, "C")];
        let mut chain = Chain::new(&handlers);
        let mut ctx = ctx();
        chain.advance(&mut ctx).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["before-A", "before-B", "before-C", "after-C", "after-B", "after-A"]
        );
        assert_eq!(chain.state(), ChainState::Completed);
        assert_eq!(chain.position(), 3);
    }

    #[test]
    fn test_short_circuit_skips_rest() {
        let log: Log = Arc::default();
        let handlers = vec![wrap(&log, "A"), stop(&log, "B"), wrap(&log, "C")];
        for _ in 0..3 {
            log.lock().clear();
            let mut chain = Chain::new(&handlers);
            let mut ctx = ctx();
            chain.advance(&mut ctx).unwrap();
            assert_eq!(*log.lock(), vec!["before-A", "B", "after-A"]);
            assert_eq!(chain.position(), 2);
            assert!(chain.is_completed());
        }
    }

    #[test]
    fn test_advance_after_short_circuit_is_noop() {
        let log: Log = Arc::default();
        let inner = Arc::clone(&log);
        let double = from_fn(move |ctx, chain| {
            chain.advance(ctx)?;
            chain.advance(ctx)?;
            inner.lock().push("A-done".to_string());
            Ok(())
        });
        let handlers = vec![double, stop(&log, "B"), stop(&log, "C")];
        let mut chain = Chain::new(&handlers);
        let mut ctx = ctx();
        chain.advance(&mut ctx).unwrap();
        assert_eq!(*log.lock(), vec!["B", "A-done"]);
        chain.advance(&mut ctx).unwrap();
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_double_advance_does_not_rerun_downstream() {
        let log: Log = Arc::default();
        let inner = Arc::clone(&log);
        let double = from_fn(move |ctx, chain| {
            chain.advance(ctx)?;
            chain.advance(ctx)?;
            inner.lock().push("A".to_string());
            Ok(())
        });
        let handlers = vec![double, wrap(&log, "B"), stop(&log, "C")];
        let mut chain = Chain::new(&handlers);
        chain.advance(&mut ctx()).unwrap();
        assert_eq!(*log.lock(), vec!["before-B", "C", "after-B", "A"]);
    }

    #[test]
    fn test_empty_chain_completes() {
        let handlers: Vec<Arc<dyn Handler>> = Vec::new();
        let mut chain = Chain::new(&handlers);
        assert_eq!(chain.state(), ChainState::Pending);
        chain.advance(&mut ctx()).unwrap();
        assert!(chain.is_completed());
    }

    #[test]
    fn test_error_stops_chain_and_unwinds_outward() {
        let log: Log = Arc::default();
        let failing = from_fn(|_ctx, _chain| Err(HandlerError::status(418, "teapot")));
        let handlers = vec![wrap(&log, "A"), failing, stop(&log, "C")];
        let mut chain = Chain::new(&handlers);
        let err = chain.advance(&mut ctx()).unwrap_err();
        assert_eq!(err.status_code(), 418);
        // A's after-code is skipped by `?`, C never runs
        assert_eq!(*log.lock(), vec!["before-A"]);
        assert!(chain.is_completed());
    }

    #[test]
    fn test_cancelled_request_skips_chain() {
        let log: Log = Arc::default();
        let handlers = vec![wrap(&log, "A"), stop(&log, "B")];
        let mut chain = Chain::new(&handlers);
        let token = CancelToken::new();
        let mut ctx = RequestContext::new(Method::GET, "/slow").with_cancel_token(token.clone());
        token.cancel();
        chain.advance(&mut ctx).unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(ctx.response.status, 503);
        assert_eq!(chain.remaining(), 2);
    }

    #[test]
    fn test_cancel_mid_chain_skips_downstream() {
        let log: Log = Arc::default();
        let cancel = from_fn(|ctx, chain| {
            ctx.cancel_token().cancel();
            chain.advance(ctx)
        });
        let handlers = vec![cancel, stop(&log, "B")];
        let mut ctx = ctx();
        Chain::new(&handlers).advance(&mut ctx).unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(ctx.response.status, 503);
    }

    #[test]
    fn test_cancel_after_last_handler_keeps_response() {
        let last = from_fn(|ctx, chain| {
            ctx.response = HandlerResponse::json(200, serde_json::json!({ "done": true }));
            ctx.cancel_token().cancel();
            chain.advance(ctx)
        });
        let handlers = vec![last];
        let mut chain = Chain::new(&handlers);
        let mut ctx = ctx();
        chain.advance(&mut ctx).unwrap();
        assert_eq!(ctx.response.status, 200);
        assert_eq!(ctx.response.body["done"], true);
        assert!(chain.is_completed());
    }

    #[test]
    fn test_error_mapping() {
        let err: HandlerError = ParamError::NotFound {
            names: vec!["id".to_string()],
        }
        .into();
        assert_eq!(err.status_code(), 400);
        let err: HandlerError = anyhow::anyhow!("db down").into();
        let resp = err.into_response();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["error"], "Internal Server Error");
    }
}
