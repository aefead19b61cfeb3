use tracing::debug;

use crate::dispatcher::{Chain, Handler, HandlerResult, RequestContext};
use crate::ids::{RequestId, REQUEST_ID_HEADER};

/// Adopts a caller-supplied `x-request-id` and echoes the id on the response.
///
/// An incoming header that is not a ULID is ignored and the id generated by
/// the dispatcher is kept, so every request has exactly one valid id.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdMiddleware;

impl Handler for RequestIdMiddleware {
    fn handle(&self, ctx: &mut RequestContext, chain: &mut Chain<'_>) -> HandlerResult {
        let incoming = ctx.get_header(REQUEST_ID_HEADER).map(RequestId::from_header);
        match incoming {
            Some(Ok(id)) => ctx.request_id = id,
            Some(Err(err)) => debug!(
                request_id = %ctx.request_id,
                header_value = %err.value,
                error = %err.reason,
                "Ignoring malformed x-request-id header"
            ),
            None => {}
        }

        let result = chain.advance(ctx);
        let id = ctx.request_id.to_string();
        ctx.response.set_header(REQUEST_ID_HEADER, id);
        result
    }

    fn name(&self) -> &str {
        "request_id"
    }
}
