//! Route groups: a shared prefix plus middleware that only applies to the
//! routes registered through the group.

use std::sync::Arc;

use http::Method;

use super::core::Router;
use super::pattern::PatternError;
use crate::dispatcher::Handler;

/// Registration scope returned by [`Router::group`].
///
/// Group middleware sits between the router's global middleware and the
/// route handler. Nested groups inherit their parent's prefix and middleware.
///
/// ```rust
/// use brrtrouter_dispatch::dispatcher::endpoint;
/// use brrtrouter_dispatch::router::Router;
///
/// let mut router = Router::new();
/// let mut api = router.group("/api");
/// let mut v1 = api.group("/v1");
/// v1.get("/users/:id", endpoint("get_user", |_ctx| Ok(()))).unwrap();
/// assert_eq!(router.routes()[0].pattern.as_ref(), "/api/v1/users/:id");
/// ```
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: Vec<Arc<dyn Handler>>,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str) -> Self {
        Self {
            router,
            prefix: prefix.trim_end_matches('/').to_string(),
            middleware: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add middleware for routes registered through this group from now on.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Handler>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Open a nested group under this group's prefix.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let mut nested = RouteGroup::new(&mut *self.router, "");
        nested.prefix = join(&self.prefix, prefix.trim_end_matches('/'));
        nested.middleware = self.middleware.clone();
        nested
    }

    /// Register a route below the group prefix.
    ///
    /// # Errors
    ///
    /// [`PatternError::MissingLeadingSlash`] when `pattern` is not absolute,
    /// otherwise whatever [`Router::register_with`] reports for the joined
    /// pattern.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash {
                pattern: pattern.to_string(),
            });
        }
        let full = join(&self.prefix, pattern);
        self.router
            .register_with(method, &full, &self.middleware, vec![handler])
    }

    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.register(method, pattern, handler)?;
        Ok(self)
    }

    pub fn get(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn patch(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::PATCH, pattern, handler)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::DELETE, pattern, handler)
    }
}

// `/` under a prefix addresses the prefix itself.
fn join(prefix: &str, pattern: &str) -> String {
    match (prefix.is_empty(), pattern == "/" || pattern.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => pattern.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}{pattern}"),
    }
}
