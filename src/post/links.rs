//! Relative image link rewriting.
//!
//! Scans markdown image references and HTML `<img>` tags, and rewrites
//! relative URLs to live under the configured asset URL prefix plus the
//! post's asset directory. Absolute URLs, fragments and non-http(s)
//! schemes are left untouched, as are paths escaping the post directory.

use super::assets::normalize_match_key;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static RE_MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!\[[^\]]*\]\()([^)\n]+)(\))").unwrap());
// No backreferences in the regex crate: double- and single-quoted values
// are separate alternatives.
static RE_HTML_IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\bsrc\s*=\s*)("([^"]*)"|'([^']*)')"#).unwrap()
});
static RE_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap());
static RE_SCHEME_WITH_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap());

/// Schemes that are never rewritten even though they match the generic
/// scheme pattern anyway; listed for clarity against mixed-case input.
const SKIPPED_SCHEMES: &[&str] = &["mailto:", "data:", "javascript:", "tel:"];

/// Whether a URL is a relative path eligible for rewriting.
pub fn is_relative_url(url: &str) -> bool {
    let target = url.trim();
    if target.is_empty() {
        return false;
    }
    if target.starts_with('/') || target.starts_with('#') {
        return false;
    }
    let lower = target.to_lowercase();
    if SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return false;
    }
    !RE_SCHEME.is_match(target)
}

/// Split a URL into its path part and a verbatim query/fragment suffix.
fn split_url_and_suffix(url: &str) -> (&str, &str) {
    let cut = url
        .find('?')
        .into_iter()
        .chain(url.find('#'))
        .min()
        .unwrap_or(url.len());
    url.split_at(cut)
}

/// Join percent-encoded path segments onto a URL prefix.
///
/// Each segment is encoded individually; `-_.~` stay verbatim. A prefix
/// that already carries a scheme (or `//`) keeps its authority untouched.
fn join_url_prefix(prefix: &str, segments: &[String]) -> String {
    let encode_all = |segments: &[String]| {
        segments
            .iter()
            .filter(|seg| !seg.is_empty())
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    };

    let clean = prefix.trim();
    if RE_SCHEME_WITH_SLASHES.is_match(clean) || clean.starts_with("//") {
        let base = clean.trim_end_matches('/');
        let encoded = encode_all(segments);
        return if encoded.is_empty() {
            base.to_owned()
        } else {
            format!("{base}/{encoded}")
        };
    }

    let leading_slash = clean.starts_with('/');
    let mut all_segments: Vec<String> = clean
        .trim_matches('/')
        .split('/')
        .filter(|seg| !seg.is_empty())
        .map(str::to_owned)
        .collect();
    all_segments.extend_from_slice(segments);
    let encoded = encode_all(&all_segments);

    if leading_slash {
        format!("/{encoded}")
    } else {
        encoded
    }
}

/// Rewrite one relative asset URL, or `None` when it must stay untouched.
fn rewrite_relative_asset_url(url: &str, asset_dir: &str, url_prefix: &str) -> Option<String> {
    if !is_relative_url(url) {
        return None;
    }

    let (path_part, suffix) = split_url_and_suffix(url.trim());
    let mut normalized = path_part.replace('\\', "/");
    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_owned();
    }
    // Paths escaping the post directory cannot be mapped into the asset
    // folder; leave them alone.
    if normalized.starts_with("../") {
        return None;
    }
    let normalized = normalized.trim_start_matches('/');
    if normalized.is_empty() {
        return None;
    }

    let rel_segments: Vec<String> = normalized
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .map(str::to_owned)
        .collect();
    if rel_segments.is_empty() {
        return None;
    }

    let mut target_segments = rel_segments;
    if normalize_match_key(&target_segments[0]) != normalize_match_key(asset_dir) {
        target_segments.insert(0, asset_dir.to_owned());
    }

    let rewritten = join_url_prefix(url_prefix, &target_segments);
    if rewritten.is_empty() {
        return None;
    }
    Some(format!("{rewritten}{suffix}"))
}

/// Split a markdown image target into (url, trailing title, angle-wrapped).
fn split_markdown_target(raw_target: &str) -> (String, String, bool) {
    let text = raw_target.trim();
    if text.is_empty() {
        return (String::new(), String::new(), false);
    }

    if let Some(rest) = text.strip_prefix('<')
        && let Some(close) = rest.find('>')
    {
        let url = rest[..close].trim().to_owned();
        let tail = rest[close + 1..].to_owned();
        return (url, tail, true);
    }

    match text.split_once(char::is_whitespace) {
        Some((url, tail)) => (url.to_owned(), format!(" {}", tail.trim_start()), false),
        None => (text.to_owned(), String::new(), false),
    }
}

/// Whether any image link in the content is still a relative URL.
pub fn has_relative_image_links(content: &str) -> bool {
    for caps in RE_MARKDOWN_IMAGE.captures_iter(content) {
        let (url, _, _) = split_markdown_target(&caps[2]);
        if !url.is_empty() && is_relative_url(&url) {
            return true;
        }
    }
    RE_HTML_IMG_SRC
        .captures_iter(content)
        .any(|caps| is_relative_url(html_src(&caps).0))
}

/// Extract the src value and quote character from an `<img>` capture.
fn html_src<'t>(caps: &'t Captures) -> (&'t str, char) {
    match caps.get(3) {
        Some(m) => (m.as_str(), '"'),
        None => (caps.get(4).map_or("", |m| m.as_str()), '\''),
    }
}

/// Rewrite relative image links against an asset directory.
///
/// Returns the rewritten content and the number of substituted links.
pub fn rewrite_image_links(content: &str, asset_dir: &str, url_prefix: &str) -> (String, usize) {
    let mut changed = 0usize;

    let content = RE_MARKDOWN_IMAGE.replace_all(content, |caps: &Captures| {
        let (url, tail, wrapped) = split_markdown_target(&caps[2]);
        if url.is_empty() {
            return caps[0].to_owned();
        }
        match rewrite_relative_asset_url(&url, asset_dir, url_prefix) {
            Some(rewritten) => {
                changed += 1;
                let target = if wrapped {
                    format!("<{rewritten}>{tail}")
                } else {
                    format!("{rewritten}{tail}")
                };
                format!("{}{}{}", &caps[1], target, &caps[3])
            }
            None => caps[0].to_owned(),
        }
    });

    let content = RE_HTML_IMG_SRC.replace_all(&content, |caps: &Captures| {
        let (url, quote) = html_src(caps);
        match rewrite_relative_asset_url(url, asset_dir, url_prefix) {
            Some(rewritten) => {
                changed += 1;
                format!("{}{quote}{rewritten}{quote}", &caps[1])
            }
            None => caps[0].to_owned(),
        }
    });

    (content.into_owned(), changed)
}
