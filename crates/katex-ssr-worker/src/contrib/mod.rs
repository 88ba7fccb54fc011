//! Extension registry owned by a worker instance.
//!
//! [`ContribRegistry::ensure_loaded`] is idempotent: every distinct name is
//! attempted at most once for the lifetime of the registry. A name that
//! cannot be resolved is recorded as failed and logged; it is never raised to
//! the caller and never retried, and the worker keeps rendering with the
//! extensions that did load. There is no unload operation.
//!
//! The registry is a plain value owned by the worker state, so separate
//! worker instances (for example in tests) never share a loaded set.

mod catalogue;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

pub use self::catalogue::{ContribCatalogue, ContribDefinition, generic_name};

/// Tracing target for extension loading.
const CONTRIB_TARGET: &str = "katex_ssr_worker::contrib";

/// Outcome of one [`ContribRegistry::ensure_loaded`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Names newly loaded by this call.
    pub loaded: Vec<String>,
    /// Names that failed to resolve during this call.
    pub failed: Vec<String>,
}

impl LoadReport {
    /// Returns `true` when the call attempted nothing new.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.loaded.is_empty() && self.failed.is_empty()
    }
}

/// Append-only record of loaded and failed extensions.
#[derive(Debug, Clone, Default)]
pub struct ContribRegistry {
    catalogue: ContribCatalogue,
    loaded: BTreeMap<String, &'static ContribDefinition>,
    active: Vec<&'static ContribDefinition>,
    failed: BTreeSet<String>,
    load_attempts: usize,
}

impl ContribRegistry {
    /// Creates an empty registry over the given catalogue.
    #[must_use]
    pub fn new(catalogue: ContribCatalogue) -> Self {
        Self {
            catalogue,
            ..Self::default()
        }
    }

    /// Loads every name not already attempted, in order.
    ///
    /// Resolution tries the name as given, then its generic form. Failures
    /// are logged and recorded; they do not abort the remaining names.
    pub fn ensure_loaded<S: AsRef<str>>(&mut self, names: &[S]) -> LoadReport {
        let mut report = LoadReport::default();
        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() || self.is_attempted(name) {
                continue;
            }
            self.load_attempts += 1;
            match self.resolve(name) {
                Some(definition) => {
                    debug!(
                        target: CONTRIB_TARGET,
                        contrib = name,
                        resolved = definition.name(),
                        macros = definition.macros().len(),
                        "loaded extension"
                    );
                    self.activate(name, definition);
                    report.loaded.push(name.to_owned());
                }
                None => {
                    warn!(
                        target: CONTRIB_TARGET,
                        contrib = name,
                        available = ?self.catalogue.names().collect::<Vec<_>>(),
                        "cannot locate extension module; continuing without it"
                    );
                    self.failed.insert(name.to_owned());
                    report.failed.push(name.to_owned());
                }
            }
        }
        report
    }

    fn resolve(&self, name: &str) -> Option<&'static ContribDefinition> {
        self.catalogue
            .lookup_conventional(name)
            .or_else(|| self.catalogue.lookup_generic(name))
    }

    fn activate(&mut self, name: &str, definition: &'static ContribDefinition) {
        self.loaded.insert(name.to_owned(), definition);
        if !self.active.iter().any(|entry| entry.name() == definition.name()) {
            self.active.push(definition);
        }
    }

    fn is_attempted(&self, name: &str) -> bool {
        self.loaded.contains_key(name) || self.failed.contains(name)
    }

    /// Returns `true` when the name was requested and resolved.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Requested names that resolved, in sorted order.
    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }

    /// Requested names that failed to resolve, in sorted order.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(String::as_str)
    }

    /// Number of resolution attempts made so far.
    #[must_use]
    pub const fn load_attempts(&self) -> usize {
        self.load_attempts
    }

    /// Macros contributed by the active extensions.
    ///
    /// Extensions apply in load order, so a later extension overrides an
    /// earlier definition of the same control sequence.
    #[must_use]
    pub fn macros(&self) -> BTreeMap<String, String> {
        let mut macros = BTreeMap::new();
        for definition in &self.active {
            for (name, expansion) in definition.macros() {
                macros.insert((*name).to_owned(), (*expansion).to_owned());
            }
        }
        macros
    }
}
