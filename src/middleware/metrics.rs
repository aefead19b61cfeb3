use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::dispatcher::{Chain, Handler, HandlerResult, RequestContext};

/// Request counters collected from inside the chain.
///
/// Tracks totals, latency, per-pattern request counts and error classes.
/// All counters use relaxed atomics; values are eventually consistent but
/// never block a request.
///
/// Share one instance between the router and the code that reads it:
///
/// ```rust
/// use std::sync::Arc;
/// use brrtrouter_dispatch::middleware::MetricsMiddleware;
/// use brrtrouter_dispatch::router::Router;
///
/// let metrics = Arc::new(MetricsMiddleware::new());
/// let mut router = Router::new();
/// router.add_middleware(Arc::clone(&metrics) as _);
/// assert_eq!(metrics.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    path_counts: DashMap<Arc<str>, AtomicUsize>,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create per-pattern counters up front so the hot path only increments.
    pub fn pre_register_paths(&self, patterns: &[String]) {
        for pattern in patterns {
            self.path_counts
                .entry(Arc::from(pattern.as_str()))
                .or_insert_with(|| AtomicUsize::new(0));
        }
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time; zero before the first request.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses with a 4xx status.
    #[must_use]
    pub fn client_errors(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    /// Responses with a 5xx status, including unrecovered handler errors.
    #[must_use]
    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Requests served by routes registered under `pattern`.
    #[must_use]
    pub fn path_count(&self, pattern: &str) -> usize {
        self.path_counts
            .get(pattern)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Snapshot of all per-pattern counters.
    #[must_use]
    pub fn path_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .path_counts
            .iter()
            .map(|e| (e.key().to_string(), e.value().load(Ordering::Relaxed)))
            .collect();
        counts.sort();
        counts
    }

    fn record_path(&self, pattern: &Arc<str>) {
        if let Some(counter) = self.path_counts.get(&**pattern) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.path_counts
            .entry(Arc::clone(pattern))
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl Handler for MetricsMiddleware {
    fn handle(&self, ctx: &mut RequestContext, chain: &mut Chain<'_>) -> HandlerResult {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.record_path(&ctx.pattern);

        let start = Instant::now();
        let result = chain.advance(ctx);
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);

        let status = match &result {
            Ok(()) => ctx.response.status,
            Err(err) => err.status_code(),
        };
        match status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        result
    }

    fn name(&self) -> &str {
        "metrics"
    }
}
