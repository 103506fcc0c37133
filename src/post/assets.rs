//! Asset-folder resolution for "post + folder of images" layouts.
//!
//! Hexo's post_asset_folder convention pairs `my-post.md` with a sibling
//! `my-post/` directory. Real corpora drift from the convention, so
//! resolution runs through a cascade: exact stem match, `stem_` prefix
//! match, then a normalized fuzzy match that ignores separators, casing and
//! trailing export-timestamp suffixes. Ambiguity resolves to the
//! lexicographically first candidate so repeated runs are reproducible.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static RE_TIMESTAMP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[0-9]{8}_[0-9]{6}$").unwrap());
static RE_SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").unwrap());
static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Strip a trailing `_YYYYMMDD_HHMMSS` export-timestamp suffix.
fn strip_timestamp_suffix(name: &str) -> &str {
    match RE_TIMESTAMP_SUFFIX.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// Reduce a name to a fuzzy comparison key: timestamp suffix stripped,
/// lowercased, separators and non-word characters removed.
pub fn normalize_match_key(name: &str) -> String {
    let base = strip_timestamp_suffix(name).to_lowercase();
    let base = RE_SEPARATOR_RUN.replace_all(&base, "");
    RE_NON_WORD.replace_all(&base, "").into_owned()
}

/// Resolve the asset directory name for a markdown file.
///
/// A file already nested in a subdirectory uses that subdirectory without
/// searching. Otherwise the cascade over the sibling directory names runs:
/// exact, unique `stem_` prefix, unique normalized match; ambiguity prefers
/// the lexicographically first prefix match, then the first normalized
/// match; no candidate means no asset directory.
pub fn resolve_asset_dir(
    markdown_path: &Path,
    source_dir: &Path,
    dir_names: &BTreeSet<String>,
) -> Option<String> {
    let parent = markdown_path.parent()?;
    if parent != source_dir {
        return parent
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }

    let stem = markdown_path.file_stem()?.to_string_lossy();
    if dir_names.contains(stem.as_ref()) {
        return Some(stem.into_owned());
    }

    // BTreeSet iteration keeps both candidate lists sorted, which is what
    // makes the ambiguity tie-break stable across runs.
    let prefix = format!("{stem}_");
    let prefix_matches: Vec<&String> = dir_names
        .iter()
        .filter(|name| name.starts_with(&prefix))
        .collect();
    if prefix_matches.len() == 1 {
        return Some(prefix_matches[0].clone());
    }

    let stem_key = normalize_match_key(&stem);
    let normalized_matches: Vec<&String> = dir_names
        .iter()
        .filter(|name| normalize_match_key(name) == stem_key)
        .collect();
    if normalized_matches.len() == 1 {
        return Some(normalized_matches[0].clone());
    }

    prefix_matches
        .first()
        .or(normalized_matches.first())
        .map(|name| (*name).clone())
}
