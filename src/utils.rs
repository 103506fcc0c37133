//! Shared text helpers: slugification and list deduplication.

use regex::Regex;
use std::sync::LazyLock;

static RE_NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").unwrap());
static RE_DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Convert text to a URL-safe slug.
///
/// Keeps unicode word characters (CJK included), collapses whitespace and
/// underscores into single dashes, and never returns an empty string:
/// unsluggable input degrades to `"item"`.
pub fn slugify(text: &str) -> String {
    let value = text.trim().to_lowercase();
    let value = RE_NON_SLUG.replace_all(&value, "");
    let value = RE_SPACE_RUN.replace_all(&value, "-");
    let value = RE_DASH_RUN.replace_all(&value, "-");
    let value = value.trim_matches('-');

    if value.is_empty() {
        "item".to_owned()
    } else {
        value.to_owned()
    }
}

/// Trim items, drop empties, and deduplicate preserving first-seen order.
pub fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        let normalized = item.trim();
        if normalized.is_empty() || seen.iter().any(|s| s == normalized) {
            continue;
        }
        seen.push(normalized.to_owned());
    }
    seen
}

/// Strip a leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}
