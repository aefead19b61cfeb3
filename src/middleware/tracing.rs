use std::time::Instant;

use tracing::{field, info, info_span};

use crate::dispatcher::{Chain, Handler, HandlerResult, RequestContext};

/// Opens a `request` span around every downstream handler and records the
/// final status and latency on it once the continuation returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Handler for TracingMiddleware {
    fn handle(&self, ctx: &mut RequestContext, chain: &mut Chain<'_>) -> HandlerResult {
        let span = info_span!(
            "request",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            route_pattern = %ctx.pattern,
            status = field::Empty,
            latency_us = field::Empty,
        );
        let start = Instant::now();
        let result = span.in_scope(|| chain.advance(ctx));
        let latency_us = start.elapsed().as_micros() as u64;

        // Errors surface as 5xx/4xx only once a recovery boundary converts them.
        let status = match &result {
            Ok(()) => ctx.response.status,
            Err(err) => err.status_code(),
        };
        span.record("status", status);
        span.record("latency_us", latency_us);
        span.in_scope(|| {
            info!(
                status,
                latency_us,
                handlers_run = chain.position(),
                "Request completed"
            );
        });
        result
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
