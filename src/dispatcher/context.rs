//! Per-request state threaded through the handler chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Extensions, Method};
use serde_json::Value;

use super::cancel::CancelToken;
use super::core::{HandlerResponse, HeaderVec};
use crate::ids::RequestId;
use crate::router::{ParamError, ParamVec, Params, RouteMatch};

/// Everything a handler can see or change for one request.
///
/// The context is created by the dispatcher after resolution and lives for
/// exactly one chain execution. Middleware typically reads request fields on
/// the way in and edits [`response`](Self::response) on the way out.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Pattern of the matched route, empty before resolution.
    pub pattern: Arc<str>,
    pub params: Params,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    pub body: Option<Value>,
    /// Response under construction.
    pub response: HandlerResponse,
    state: HashMap<String, Value>,
    extensions: Extensions,
    cancel: CancelToken,
    started: Instant,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            pattern: Arc::from(""),
            params: Params::new(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body: None,
            response: HandlerResponse::new(200, HeaderVec::new(), Value::Null),
            state: HashMap::new(),
            extensions: Extensions::new(),
            cancel: CancelToken::new(),
            started: Instant::now(),
        }
    }

    /// Bind the matched route's pattern and parameters.
    #[must_use]
    pub fn with_route(mut self, route: &RouteMatch) -> Self {
        self.pattern = Arc::clone(&route.entry.pattern);
        self.params = route.params.clone();
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Parse `query` (without the leading `?`) into query parameters.
    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query_params = parse_query(query);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderVec) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Path parameter by name.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Resolve the `id` / `_id` path parameter.
    pub fn id(&self) -> Result<&str, ParamError> {
        self.params.id()
    }

    /// Query parameter by name; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Request header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Store a value for downstream handlers.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn remove_state(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }

    /// Typed extensions for values that are not JSON.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Decode an `application/x-www-form-urlencoded` query string.
#[must_use]
pub fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::<str>::from(&*k), v.into_owned()))
        .collect()
}
