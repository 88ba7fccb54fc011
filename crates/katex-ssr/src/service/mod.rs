//! Render facade composing the cache and the worker channel.
//!
//! Every caller goes through [`RenderService::render`]. Cache hits are
//! answered without touching the worker; misses queue on the channel's
//! single in-flight slot. Formulas the worker rejects degrade to marked-up
//! source instead of failing the build.

mod fallback;
mod stats;

use katex_ssr_config::Config;
use katex_ssr_protocol::{FormulaRequest, RenderOptions, RenderResponse};
use tracing::{debug, info, warn};

pub use self::fallback::{FALLBACK_CLASS, fallback_html};
pub use self::stats::{RenderStats, StatsSnapshot};
use crate::cache::{CacheKey, RenderCache};
use crate::error::RenderServiceError;
use crate::supervisor::{ChannelSupervisor, RenderChannel};

/// Log target for render service operations.
const SERVICE_TARGET: &str = "katex_ssr::service";

/// Defaults applied to every render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSettings {
    /// Options each request's own options are merged over.
    pub options: RenderOptions,
    /// Extensions every request needs.
    pub contribs: Vec<String>,
    /// Whether [`RenderService::finish`] reports counters at info level.
    pub verbose: bool,
}

impl RenderSettings {
    /// Extracts the render defaults from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            options: config.katex_options.clone(),
            contribs: config.ssr_contribs(),
            verbose: config.verbose,
        }
    }
}

/// Turns TeX sources into HTML through a cache and a rendering worker.
#[derive(Debug)]
pub struct RenderService<C: RenderChannel = ChannelSupervisor> {
    channel: C,
    cache: RenderCache,
    settings: RenderSettings,
    stats: RenderStats,
}

impl<C: RenderChannel> RenderService<C> {
    /// Composes a service from its parts.
    #[must_use]
    pub fn new(channel: C, cache: RenderCache, settings: RenderSettings) -> Self {
        Self {
            channel,
            cache,
            settings,
            stats: RenderStats::default(),
        }
    }

    /// Renders one formula.
    ///
    /// `options` are merged over the configured defaults, with per-call keys
    /// winning, and `contribs` are added to the configured extensions. A
    /// formula the worker rejects yields fallback markup rather than an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`RenderServiceError::Channel`] when the worker cannot be
    /// reached or breaks protocol.
    pub fn render(
        &self,
        latex: &str,
        display_mode: bool,
        options: &RenderOptions,
        contribs: &[String],
    ) -> Result<String, RenderServiceError> {
        self.stats.record_formula();
        let source = latex.trim();
        let merged = self.merge_options(options);
        let requested: Vec<String> = self
            .settings
            .contribs
            .iter()
            .chain(contribs)
            .cloned()
            .collect();

        // Lookups use the extension set the worker will hold once the
        // requested names are loaded.
        let mut active = self.channel.active_contribs();
        active.extend(requested.iter().cloned());
        let key = CacheKey::derive(source, display_mode, &merged, &active);
        if let Some(html) = self.cache.get(&key) {
            self.stats.record_cache_hit();
            debug!(target: SERVICE_TARGET, key = %key, "cache hit");
            return Ok(String::from(&*html));
        }

        self.channel.ensure_contribs(&requested)?;
        self.stats.record_worker_call();
        let formula = FormulaRequest::new(source, display_mode, merged);
        let reply = self.channel.call(&formula)?;
        // Another caller may have loaded more extensions in the meantime;
        // the result is filed under the set that actually produced it.
        let held = CacheKey::derive(source, display_mode, formula.options(), &reply.contribs);
        if held != key {
            debug!(
                target: SERVICE_TARGET,
                expected = %key,
                held = %held,
                "worker held a different extension set than looked up"
            );
        }
        Ok(self.settle(held, source, reply.response))
    }

    /// Renders one formula with only the configured options and extensions.
    ///
    /// # Errors
    ///
    /// See [`Self::render`].
    pub fn render_formula(
        &self,
        latex: &str,
        display_mode: bool,
    ) -> Result<String, RenderServiceError> {
        self.render(latex, display_mode, &RenderOptions::new(), &[])
    }

    fn merge_options(&self, options: &RenderOptions) -> RenderOptions {
        let mut merged = self.settings.options.clone();
        merged.extend(
            options
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        merged
    }

    fn settle(&self, key: CacheKey, source: &str, response: RenderResponse) -> String {
        match response {
            RenderResponse::Success { html, .. } => {
                self.cache.put(key, html.as_str());
                html
            }
            RenderResponse::Error { message, .. } => {
                self.stats.record_render_error();
                warn!(
                    target: SERVICE_TARGET,
                    latex = source,
                    %message,
                    "formula failed to render; emitting fallback markup"
                );
                fallback_html(source, &message)
            }
        }
    }

    /// Current counter values.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Cache consulted before every worker call.
    #[must_use]
    pub const fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Worker channel used on cache misses.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Render defaults in effect.
    #[must_use]
    pub const fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Reports the run's counters and stops the worker.
    ///
    /// Counters are logged at info level when verbose output is configured
    /// and at debug level otherwise.
    pub fn finish(&self) {
        let snapshot = self.stats.snapshot();
        if self.settings.verbose {
            info!(
                target: SERVICE_TARGET,
                formulas = snapshot.formulas,
                cache_hits = snapshot.cache_hits,
                worker_calls = snapshot.worker_calls,
                render_errors = snapshot.render_errors,
                elapsed_ms = u64::try_from(snapshot.elapsed.as_millis()).unwrap_or(u64::MAX),
                "{snapshot}"
            );
        } else {
            debug!(target: SERVICE_TARGET, "{snapshot}");
        }
        self.channel.shutdown();
    }
}
