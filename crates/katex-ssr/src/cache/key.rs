//! Content-addressed fingerprints of render requests.

use std::fmt;

use katex_ssr_protocol::RenderOptions;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

/// Version of the fingerprint scheme; bump when the canonical form changes
/// so persisted entries from an older scheme are never reused.
const KEY_SCHEME_VERSION: u64 = 1;

/// Deterministic fingerprint of every input that affects rendered output.
///
/// Two requests with equal keys are interchangeable. The key covers the
/// trimmed TeX source, the display mode, every option and the set of
/// extensions active in the worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for one formula.
    ///
    /// Object keys inside `options` are sorted recursively and `contribs` is
    /// treated as a set, so neither insertion order nor duplicates change
    /// the key.
    #[must_use]
    pub fn derive(
        latex: &str,
        display_mode: bool,
        options: &RenderOptions,
        contribs: &[String],
    ) -> Self {
        let mut extensions: Vec<&str> = contribs.iter().map(|name| name.trim()).collect();
        extensions.sort_unstable();
        extensions.dedup();

        let document = canonical(&json!({
            "v": KEY_SCHEME_VERSION,
            "latex": latex.trim(),
            "displayMode": display_mode,
            "options": Value::Object(options.clone()),
            "contribs": extensions,
        }));
        let mut hasher = Sha256::new();
        hasher.update(document.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Lowercase hexadecimal digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Two-character prefix used to shard persisted entries.
    #[must_use]
    pub fn shard(&self) -> &str {
        self.0.get(..2).unwrap_or("00")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Rebuilds `value` with every object's keys in sorted order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut entries: Vec<(&String, &Value)> = fields.iter().collect();
            entries.sort_by(|left, right| left.0.cmp(right.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(name, field)| (name.clone(), canonical(field)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
