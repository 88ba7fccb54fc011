//! Counters surfaced when verbose output is requested.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters updated by every render.
#[derive(Debug)]
pub struct RenderStats {
    formulas: AtomicU64,
    cache_hits: AtomicU64,
    worker_calls: AtomicU64,
    render_errors: AtomicU64,
    started: Instant,
}

impl Default for RenderStats {
    fn default() -> Self {
        Self {
            formulas: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            worker_calls: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            started: Instant::now(),
        }
    }
}

impl RenderStats {
    pub(crate) fn record_formula(&self) {
        self.formulas.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_worker_call(&self) {
        self.worker_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_render_error(&self) {
        self.render_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            formulas: self.formulas.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            worker_calls: self.worker_calls.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

/// Point-in-time copy of [`RenderStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Formulas submitted to the service.
    pub formulas: u64,
    /// Formulas answered from the cache.
    pub cache_hits: u64,
    /// Round-trips made to the worker.
    pub worker_calls: u64,
    /// Formulas the worker rejected.
    pub render_errors: u64,
    /// Time since the service was created.
    pub elapsed: Duration,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "rendered {} formulas ({} cached, {} worker calls, {} errors) in {:.2?}",
            self.formulas, self.cache_hits, self.worker_calls, self.render_errors, self.elapsed
        )
    }
}
