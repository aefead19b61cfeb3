use std::sync::Arc;

use serde_json::json;

use crate::dispatcher::{endpoint, Handler, HandlerResponse, HandlerResult, RequestContext};

// Example handler: echoes back what routing and dispatch bound for the request
pub fn echo_handler(ctx: &mut RequestContext) -> HandlerResult {
    let query: serde_json::Map<String, serde_json::Value> = ctx
        .query_params
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();

    ctx.response = HandlerResponse::json(
        200,
        json!({
            "request_id": ctx.request_id,
            "method": ctx.method.as_str(),
            "path": ctx.path,
            "pattern": ctx.pattern.as_ref(),
            "params": ctx.params.to_map(),
            "query": query,
            "body": ctx.body,
        }),
    );
    Ok(())
}

/// [`echo_handler`] wrapped for registration under `name`.
#[must_use]
pub fn echo(name: &str) -> Arc<dyn Handler> {
    endpoint(name, echo_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Dispatcher, Request};
    use crate::router::Router;

    #[test]
    fn test_echo_reports_bindings() {
        let mut router = Router::new();
        router.get("/pets/{id}", echo("get_pet")).unwrap();
        let dispatcher = Dispatcher::new(router);

        let resp = dispatcher.dispatch(Request::get("/pets/12?verbose=true")).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["pattern"], "/pets/{id}");
        assert_eq!(resp.body["params"]["id"], "12");
        assert_eq!(resp.body["query"]["verbose"], "true");
        assert_eq!(resp.body["method"], "GET");
        assert!(resp.body["request_id"].is_string());
    }
}
