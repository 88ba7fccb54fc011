//! Statically linked typesetting extensions.
//!
//! Each extension contributes a table of KaTeX macros. Extensions are looked
//! up by name in a fixed catalogue; nothing is ever resolved dynamically.

/// A statically linked extension.
#[derive(Debug, PartialEq, Eq)]
pub struct ContribDefinition {
    name: &'static str,
    summary: &'static str,
    macros: &'static [(&'static str, &'static str)],
}

impl ContribDefinition {
    /// Declares an extension.
    #[must_use]
    pub const fn new(
        name: &'static str,
        summary: &'static str,
        macros: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            name,
            summary,
            macros,
        }
    }

    /// Canonical extension name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// One-line description.
    #[must_use]
    pub const fn summary(&self) -> &'static str {
        self.summary
    }

    /// Macro definitions as `(control sequence, expansion)` pairs.
    #[must_use]
    pub const fn macros(&self) -> &'static [(&'static str, &'static str)] {
        self.macros
    }
}

const BRAKET: ContribDefinition = ContribDefinition::new(
    "braket",
    "Dirac bra-ket notation",
    &[
        (r"\bra", r"\left\langle #1 \right|"),
        (r"\ket", r"\left| #1 \right\rangle"),
        (r"\braket", r"\left\langle #1 \middle| #2 \right\rangle"),
        (r"\ketbra", r"\left| #1 \right\rangle\!\left\langle #2 \right|"),
        (r"\expval", r"\left\langle #1 \right\rangle"),
    ],
);

const PHYSICS: ContribDefinition = ContribDefinition::new(
    "physics",
    "derivative, absolute value and norm helpers",
    &[
        (r"\abs", r"\left\lvert #1 \right\rvert"),
        (r"\norm", r"\left\lVert #1 \right\rVert"),
        (r"\dv", r"\frac{\mathrm{d} #1}{\mathrm{d} #2}"),
        (r"\pdv", r"\frac{\partial #1}{\partial #2}"),
        (r"\order", r"\mathcal{O}\left( #1 \right)"),
        (r"\grad", r"\nabla"),
        (r"\curl", r"\nabla\times"),
        (r"\divergence", r"\nabla\cdot"),
    ],
);

const SETS: ContribDefinition = ContribDefinition::new(
    "sets",
    "blackboard-bold number sets",
    &[
        (r"\N", r"\mathbb{N}"),
        (r"\Z", r"\mathbb{Z}"),
        (r"\Q", r"\mathbb{Q}"),
        (r"\R", r"\mathbb{R}"),
        (r"\C", r"\mathbb{C}"),
        (r"\set", r"\left\{ #1 \right\}"),
    ],
);

static BUILTIN: [ContribDefinition; 3] = [BRAKET, PHYSICS, SETS];

/// Prefixes stripped when falling back to a generic name.
const GENERIC_PREFIXES: [&str; 2] = ["katex/contrib/", "contrib/"];

/// Suffixes stripped when falling back to a generic name.
const GENERIC_SUFFIXES: [&str; 2] = [".min.js", ".js"];

/// Fixed set of extensions the worker can load.
#[derive(Debug, Clone, Copy)]
pub struct ContribCatalogue {
    entries: &'static [ContribDefinition],
}

impl Default for ContribCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ContribCatalogue {
    /// Catalogue of the extensions linked into this worker.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(&BUILTIN)
    }

    /// Catalogue over an arbitrary static table.
    #[must_use]
    pub const fn new(entries: &'static [ContribDefinition]) -> Self {
        Self { entries }
    }

    /// Names of every extension in the catalogue.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(ContribDefinition::name)
    }

    /// Looks a name up exactly as given.
    #[must_use]
    pub fn lookup_conventional(&self, name: &str) -> Option<&'static ContribDefinition> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Looks a name up after reducing it to its generic form.
    ///
    /// Module-style spellings such as `katex/contrib/braket.min.js` reduce
    /// to `braket`.
    #[must_use]
    pub fn lookup_generic(&self, name: &str) -> Option<&'static ContribDefinition> {
        let generic = generic_name(name);
        self.entries.iter().find(|entry| entry.name == generic)
    }
}

/// Reduces a module-style extension reference to its bare lowercase name.
#[must_use]
pub fn generic_name(name: &str) -> String {
    let mut reduced = name.trim();
    for prefix in GENERIC_PREFIXES {
        if let Some(rest) = reduced.strip_prefix(prefix) {
            reduced = rest;
            break;
        }
    }
    for suffix in GENERIC_SUFFIXES {
        if let Some(rest) = reduced.strip_suffix(suffix) {
            reduced = rest;
            break;
        }
    }
    reduced.to_ascii_lowercase()
}
