//! Degraded markup for formulas the worker rejects.

/// Class marking formulas that failed to typeset.
pub const FALLBACK_CLASS: &str = "katex-ssr-error";

/// Wraps the raw source in a visibly marked fragment carrying the diagnostic.
#[must_use]
pub fn fallback_html(latex: &str, message: &str) -> String {
    format!(
        r#"<span class="{FALLBACK_CLASS}" title="{}"><code>{}</code></span>"#,
        escape_html(message),
        escape_html(latex)
    )
}

/// Escapes the characters that are significant in HTML text and attributes.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
