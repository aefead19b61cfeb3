//! Declarative route tables.
//!
//! A route table lists routes by method, pattern and handler *name*; a
//! [`HandlerRegistry`] supplies the handlers behind the names. Tables can be
//! written in YAML, TOML or JSON:
//!
//! ```yaml
//! middleware: [recovery, tracing]
//! routes:
//!   - method: GET
//!     path: /pets/:id
//!     handler: get_pet
//!   - method: POST
//!     path: /admin/*rest
//!     handler: admin
//!     middleware: [request_id]
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatcher::Handler;
use crate::middleware::{RecoveryMiddleware, RequestIdMiddleware, TracingMiddleware};
use crate::router::Router;

/// One row of a route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    pub handler: String,
    /// Route-level middleware names, run after the global middleware.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
}

/// A full route table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    /// Global middleware names, installed before any route.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl RouteTable {
    /// Load a table, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read route table {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let table: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid YAML route table {}", path.display()))?,
            "toml" => toml::from_str(&raw)
                .with_context(|| format!("invalid TOML route table {}", path.display()))?,
            "json" => serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON route table {}", path.display()))?,
            other => bail!(
                "unsupported route table format '{other}' for {} (expected yaml, yml, toml or json)",
                path.display()
            ),
        };
        info!(
            path = %path.display(),
            routes_count = table.routes.len(),
            middleware_count = table.middleware.len(),
            "Route table loaded"
        );
        Ok(table)
    }

    /// Every handler and middleware name the table refers to, deduplicated.
    #[must_use]
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let all = self.middleware.iter().chain(
            self.routes
                .iter()
                .flat_map(|r| r.middleware.iter().chain(std::iter::once(&r.handler))),
        );
        for name in all {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        names
    }
}

/// Names to handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    fallback: Option<Arc<dyn Handler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `recovery`, `tracing` and `request_id`.
    #[must_use]
    pub fn with_builtin_middleware() -> Self {
        let mut registry = Self::new();
        registry.register("recovery", Arc::new(RecoveryMiddleware::new()));
        registry.register("tracing", Arc::new(TracingMiddleware));
        registry.register("request_id", Arc::new(RequestIdMiddleware));
        registry
    }

    pub fn register(&mut self, name: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.handlers.insert(name.to_string(), handler);
        self
    }

    /// Handler used for names that are not registered.
    pub fn set_fallback(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.fallback = Some(handler);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers
            .get(name)
            .or(self.fallback.as_ref())
            .map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    fn require(&self, name: &str) -> Result<Arc<dyn Handler>> {
        self.get(name)
            .ok_or_else(|| anyhow!("unknown handler '{name}'"))
    }
}

/// Parse a method name from a table, case-insensitively.
pub fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))
}

impl Router {
    /// Build a router from a route table.
    ///
    /// # Errors
    ///
    /// Unknown handler or middleware names, invalid methods, and pattern
    /// errors, each annotated with the offending table row.
    pub fn from_table(table: &RouteTable, registry: &HandlerRegistry) -> Result<Self> {
        let mut router = Router::new();
        router.extend_from_table(table, registry)?;
        Ok(router)
    }

    /// Register every row of `table` on this router.
    pub fn extend_from_table(
        &mut self,
        table: &RouteTable,
        registry: &HandlerRegistry,
    ) -> Result<()> {
        for name in &table.middleware {
            let middleware = registry
                .require(name)
                .context("failed to resolve global middleware")?;
            self.add_middleware(middleware);
        }

        for (idx, spec) in table.routes.iter().enumerate() {
            let row = || format!("route #{idx} ({} {})", spec.method, spec.path);
            let method = parse_method(&spec.method).with_context(row)?;
            let middleware = spec
                .middleware
                .iter()
                .map(|name| registry.require(name))
                .collect::<Result<Vec<_>>>()
                .with_context(row)?;
            let handler = registry.require(&spec.handler).with_context(row)?;
            self.register_with(method, &spec.path, &middleware, vec![handler])
                .with_context(row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::echo;

    fn spec(method: &str, path: &str, handler: &str) -> RouteSpec {
        RouteSpec {
            method: method.to_string(),
            path: path.to_string(),
            handler: handler.to_string(),
            middleware: Vec::new(),
        }
    }

    #[test]
    fn test_unknown_handler_names_row() {
        let table = RouteTable {
            middleware: Vec::new(),
            routes: vec![spec("GET", "/a", "missing")],
        };
        let err = Router::from_table(&table, &HandlerRegistry::new()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("route #0 (GET /a)"), "{msg}");
        assert!(msg.contains("unknown handler 'missing'"), "{msg}");
    }

    #[test]
    fn test_fallback_handler() {
        let mut registry = HandlerRegistry::new();
        registry.set_fallback(echo("echo"));
        let table = RouteTable {
            middleware: Vec::new(),
            routes: vec![spec("get", "/a", "anything")],
        };
        let router = Router::from_table(&table, &registry).unwrap();
        assert_eq!(router.routes()[0].method, Method::GET);
    }

    #[test]
    fn test_referenced_names_dedup() {
        let table = RouteTable {
            middleware: vec!["recovery".to_string()],
            routes: vec![
                RouteSpec {
                    middleware: vec!["tracing".to_string()],
                    ..spec("GET", "/a", "a")
                },
                spec("GET", "/b", "a"),
            ],
        };
        assert_eq!(table.referenced_names(), vec!["recovery", "tracing", "a"]);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("patch").unwrap(), Method::PATCH);
        assert!(parse_method("GE T").is_err());
    }
}
