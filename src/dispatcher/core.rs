use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;

use super::cancel::CancelToken;
use super::chain::{Chain, HandlerError};
use super::context::RequestContext;
use crate::ids::RequestId;
use crate::router::{AllowedMethods, RouteLookup, Router, SharedRouter};
use crate::runtime_config::RuntimeConfig;

/// Maximum number of headers before heap allocation.
/// Most HTTP requests have <16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Header names use `Arc<str>`: names repeat across requests and cloning an
/// `Arc` is an atomic increment instead of a string copy.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Response written by the handler chain.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// `{"error": message}` with the given status.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-neutral request handed to the dispatcher by the host server.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path plus optional `?query`.
    pub uri: String,
    pub headers: HeaderVec,
    pub body: Option<Value>,
    /// Identifier assigned by the host; generated when absent.
    pub request_id: Option<RequestId>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: HeaderVec::new(),
            body: None,
            request_id: None,
        }
    }

    #[must_use]
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Path and query string, split at the first `?`.
    #[must_use]
    pub fn path_and_query(&self) -> (&str, &str) {
        match self.uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (self.uri.as_str(), ""),
        }
    }
}

/// Why a request did not produce a response.
#[derive(Debug)]
pub enum DispatchError {
    NotFound {
        method: Method,
        path: String,
    },
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: AllowedMethods,
    },
    /// A handler failed and no recovery middleware converted the error.
    Handler(HandlerError),
}

impl DispatchError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::NotFound { .. } => 404,
            DispatchError::MethodNotAllowed { .. } => 405,
            DispatchError::Handler(err) => err.status_code(),
        }
    }

    /// Response a server should send for this error.
    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        match self {
            DispatchError::NotFound { .. } => HandlerResponse::error(404, "Not Found"),
            DispatchError::MethodNotAllowed { allowed, .. } => {
                let mut resp = HandlerResponse::error(405, "Method Not Allowed");
                resp.set_header("allow", allowed.header_value());
                resp
            }
            DispatchError::Handler(err) => err.into_response(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            DispatchError::MethodNotAllowed {
                method,
                path,
                allowed,
            } => write!(
                f,
                "method {method} not allowed for {path} (allowed: {})",
                allowed.header_value()
            ),
            DispatchError::Handler(err) => write!(f, "handler failed: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        DispatchError::Handler(err)
    }
}

/// Resolves requests against a live router and runs the matched chain.
///
/// Cheap to clone; clones share the same [`SharedRouter`], so routes
/// registered through one handle are visible to all of them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Arc<SharedRouter>,
    config: RuntimeConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Router::default())
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self::with_config(router, RuntimeConfig::default())
    }

    /// Dispatcher whose router adopts the resolution settings in `config`.
    #[must_use]
    pub fn with_config(router: Router, config: RuntimeConfig) -> Self {
        Self {
            router: Arc::new(SharedRouter::with_config(router, &config)),
            config,
        }
    }

    /// Dispatcher over an existing shared router.
    ///
    /// `config` is applied to the shared router, including tables it
    /// publishes later through [`SharedRouter::replace`].
    #[must_use]
    pub fn from_shared(router: Arc<SharedRouter>, config: RuntimeConfig) -> Self {
        router.configure(&config);
        Self { router, config }
    }

    #[must_use]
    pub fn router(&self) -> &Arc<SharedRouter> {
        &self.router
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Resolve and run one request.
    ///
    /// A cancel token is created from the configured request timeout, if
    /// any. Handler errors that no middleware recovered are returned as
    /// [`DispatchError::Handler`]; handler panics are not caught here.
    pub fn dispatch(&self, request: Request) -> Result<HandlerResponse, DispatchError> {
        let token = match self.config.request_timeout() {
            Some(timeout) => CancelToken::with_timeout(timeout),
            None => CancelToken::new(),
        };
        self.dispatch_with_token(request, token)
    }

    /// Like [`dispatch`](Self::dispatch) with a host-supplied cancel token.
    pub fn dispatch_with_token(
        &self,
        request: Request,
        token: CancelToken,
    ) -> Result<HandlerResponse, DispatchError> {
        let start = Instant::now();
        let (path, query) = request.path_and_query();

        let route = match self.router.resolve(&request.method, path) {
            RouteLookup::Match(route) => route,
            RouteLookup::MethodNotAllowed { allowed } => {
                return Err(DispatchError::MethodNotAllowed {
                    method: request.method.clone(),
                    path: path.to_string(),
                    allowed,
                });
            }
            RouteLookup::NotFound => {
                return Err(DispatchError::NotFound {
                    method: request.method.clone(),
                    path: path.to_string(),
                });
            }
        };

        let mut ctx = RequestContext::new(request.method.clone(), path)
            .with_route(&route)
            .with_query(query)
            .with_cancel_token(token);
        if let Some(request_id) = request.request_id {
            ctx = ctx.with_request_id(request_id);
        }
        let Request { headers, body, .. } = request;
        let mut ctx = ctx.with_headers(headers).with_body(body);

        let mut chain = Chain::new(&route.entry.chain);
        chain.advance(&mut ctx)?;

        if ctx.method == Method::HEAD {
            ctx.response.body = Value::Null;
        }

        debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            route_pattern = %ctx.pattern,
            status = ctx.response.status,
            handlers_run = chain.position(),
            latency_us = start.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        Ok(ctx.response)
    }

    /// Dispatch and map every [`DispatchError`] to its response.
    #[must_use]
    pub fn handle(&self, request: Request) -> HandlerResponse {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}
