//! Live router that can be extended while requests are being resolved.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use http::Method;
use tracing::info;

use super::core::{RouteLookup, Router};
use super::pattern::PatternError;
use crate::dispatcher::Handler;
use crate::runtime_config::RuntimeConfig;

/// Read-mostly router handle shared between request threads.
///
/// Readers load the current snapshot without locking. Writers are serialised
/// by a mutex and publish a fully built copy, so a reader sees either the
/// table before a registration or after it, never a half-linked trie.
///
/// Once [`configure`](Self::configure) has been called, every table
/// published through [`replace`](Self::replace) adopts the same resolution
/// settings.
#[derive(Debug)]
pub struct SharedRouter {
    current: ArcSwap<Router>,
    /// Serialises writers; holds the settings applied to replaced tables.
    writer: Mutex<Option<RuntimeConfig>>,
}

impl Default for SharedRouter {
    fn default() -> Self {
        Self::new(Router::default())
    }
}

impl SharedRouter {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            current: ArcSwap::from_pointee(router),
            writer: Mutex::new(None),
        }
    }

    /// Shared router whose tables always follow `config`.
    #[must_use]
    pub fn with_config(mut router: Router, config: &RuntimeConfig) -> Self {
        router.configure(config);
        Self {
            current: ArcSwap::from_pointee(router),
            writer: Mutex::new(Some(config.clone())),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Router> {
        self.current.load_full()
    }

    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> RouteLookup {
        self.current.load().resolve(method, path)
    }

    /// Apply `config` to the current table and remember it for later
    /// replacements.
    pub fn configure(&self, config: &RuntimeConfig) {
        let mut settings = self.lock_writer();
        let mut next = Router::clone(&self.current.load());
        next.configure(config);
        self.current.store(Arc::new(next));
        *settings = Some(config.clone());
    }

    /// Settings applied to replaced tables, if any were configured.
    #[must_use]
    pub fn config(&self) -> Option<RuntimeConfig> {
        self.lock_writer().clone()
    }

    /// Register one route on a copy of the table and publish it.
    ///
    /// # Errors
    ///
    /// [`PatternError`] from registration; the published table is unchanged.
    pub fn register(
        &self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), PatternError> {
        self.update(|router| router.register(method, pattern, handler))
    }

    /// Apply `f` to a copy of the current router and publish the copy when
    /// `f` succeeds.
    pub fn update<F, E>(&self, f: F) -> Result<(), E>
    where
        F: FnOnce(&mut Router) -> Result<(), E>,
    {
        let _settings = self.lock_writer();
        let mut next = Router::clone(&self.current.load());
        f(&mut next)?;
        let routes_count = next.len();
        self.current.store(Arc::new(next));
        info!(routes_count, "Routing table updated");
        Ok(())
    }

    /// Replace the whole table, applying the configured settings to it.
    pub fn replace(&self, mut router: Router) {
        let settings = self.lock_writer();
        if let Some(config) = settings.as_ref() {
            router.configure(config);
        }
        info!(routes_count = router.len(), "Routing table replaced");
        self.current.store(Arc::new(router));
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<RuntimeConfig>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
