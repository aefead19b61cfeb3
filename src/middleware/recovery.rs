use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, warn};

use crate::dispatcher::{
    Chain, Handler, HandlerError, HandlerResponse, HandlerResult, RequestContext,
};

/// Fault boundary for everything after it in the chain.
///
/// Install it first so it wraps every other middleware. Handler errors are
/// turned into their error response; panics are caught, logged with a
/// backtrace and answered with a 500. Either way the chain is completed and
/// the request still gets a response.
#[derive(Debug, Default, Clone)]
pub struct RecoveryMiddleware {
    expose_details: bool,
}

impl RecoveryMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put the panic message in the 500 body. Development only.
    #[must_use]
    pub fn expose_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    fn recover_error(&self, ctx: &mut RequestContext, err: HandlerError) {
        let status = err.status_code();
        if status >= 500 {
            error!(
                request_id = %ctx.request_id,
                route_pattern = %ctx.pattern,
                status,
                error = %err,
                "Handler failed - recovered"
            );
        } else {
            warn!(
                request_id = %ctx.request_id,
                route_pattern = %ctx.pattern,
                status,
                error = %err,
                "Handler rejected request"
            );
        }
        ctx.response = err.into_response();
    }

    fn recover_panic(&self, ctx: &mut RequestContext, panic: Box<dyn Any + Send>) {
        let panic_message = panic_message(panic.as_ref());
        let backtrace = std::backtrace::Backtrace::capture();
        error!(
            request_id = %ctx.request_id,
            route_pattern = %ctx.pattern,
            panic_message = %panic_message,
            backtrace = %backtrace,
            "Handler panicked - CRITICAL"
        );
        ctx.response = if self.expose_details {
            HandlerResponse::error(500, &format!("Handler panicked: {panic_message}"))
        } else {
            HandlerResponse::error(500, "Internal Server Error")
        };
    }
}

impl Handler for RecoveryMiddleware {
    fn handle(&self, ctx: &mut RequestContext, chain: &mut Chain<'_>) -> HandlerResult {
        match catch_unwind(AssertUnwindSafe(|| chain.advance(ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.recover_error(ctx, err),
            Err(panic) => {
                chain.complete();
                self.recover_panic(ctx, panic);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recovery"
    }
}

/// Best-effort text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
