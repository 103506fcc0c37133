//! Post discovery and assembly.
//!
//! Walks the source tree, parses each markdown file into a [`HexoPost`]
//! record and applies the content pipeline: front-matter split, math
//! normalization, relative image link rewriting. One malformed file never
//! aborts the batch; it degrades to defaults and the run continues.

pub mod assets;
pub mod date;
pub mod front_matter;
pub mod links;
pub mod math;

use crate::config::{AssetMode, ImportConfig};
use crate::utils::slugify;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use front_matter::{FrontMatterParser, meta_get, normalize_string_list};
use serde_yaml::{Mapping, Value};
use std::{
    collections::BTreeSet,
    fmt, fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

// ============================================================================
// Post Record
// ============================================================================

/// Publication status mapped onto Typecho's status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostStatus {
    #[default]
    Publish,
    Draft,
    Private,
    Hidden,
    Waiting,
}

impl PostStatus {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "publish" => Some(Self::Publish),
            "draft" => Some(Self::Draft),
            "private" => Some(Self::Private),
            "hidden" => Some(Self::Hidden),
            "waiting" => Some(Self::Waiting),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
            Self::Private => "private",
            Self::Hidden => "hidden",
            Self::Waiting => "waiting",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content type mapped onto Typecho's type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostType {
    #[default]
    Post,
    Page,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
        }
    }
}

/// One fully assembled post, immutable once constructed.
#[derive(Debug, Clone)]
pub struct HexoPost {
    pub source_path: PathBuf,
    pub title: String,
    /// Always a non-empty URL-safe slug.
    pub slug: String,
    pub date: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub author: String,
    pub content: String,
    pub excerpt: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub post_type: PostType,
    pub asset_dir_name: Option<String>,
    pub rewritten_image_links: usize,
}

// ============================================================================
// Collection
// ============================================================================

/// Discover and assemble all posts under `source_dir`.
///
/// Returns the posts sorted ascending by publish date (stable, so undated
/// posts resolved to run-start time keep discovery order among themselves)
/// together with the non-fatal warnings collected along the way.
pub fn collect_posts(
    config: &ImportConfig,
    source_dir: &Path,
) -> Result<(Vec<HexoPost>, Vec<String>)> {
    // Captured once so every undated post resolves to the same instant.
    let run_started = Local::now().fixed_offset();
    let parser = FrontMatterParser::new(config.input.front_matter);

    let mut asset_dir_names = BTreeSet::new();
    for entry in fs::read_dir(source_dir)
        .with_context(|| format!("failed to list {}", source_dir.display()))?
    {
        let entry = entry?;
        if entry.path().is_dir() {
            asset_dir_names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }

    let mut posts = Vec::new();
    let mut warnings = Vec::new();

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        let (post, warning) = read_post(
            entry.path(),
            source_dir,
            &asset_dir_names,
            config,
            &parser,
            run_started,
        )?;
        if post.status != PostStatus::Publish && !config.input.include_drafts {
            continue;
        }
        posts.push(post);
        warnings.extend(warning);
    }

    posts.sort_by_key(|post| post.date);
    Ok((posts, warnings))
}

fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
        ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown")
    })
}

// ============================================================================
// Assembly
// ============================================================================

/// Parse one markdown file into a post, plus an optional non-fatal warning.
fn read_post(
    path: &Path,
    source_dir: &Path,
    asset_dir_names: &BTreeSet<String>,
    config: &ImportConfig,
    parser: &FrontMatterParser,
    run_started: DateTime<FixedOffset>,
) -> Result<(HexoPost, Option<String>)> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let raw = String::from_utf8_lossy(&raw);
    let (meta, body) = parser.split(&raw);

    let default_stem = default_post_stem(path, source_dir);
    let title = meta_string(&meta, "title").unwrap_or_else(|| default_stem.clone());
    let slug_source = meta_string(&meta, "slug")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or(default_stem);
    let author = meta_string(&meta, "author")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.sql.author.clone());
    let date = date::parse_date_value(meta_get(&meta, "date"), run_started);
    let updated = date::parse_date_value(meta_get(&meta, "updated"), date);
    let excerpt = meta_string(&meta, "excerpt")
        .or_else(|| meta_string(&meta, "description"))
        .map(|s| s.trim().to_owned())
        .unwrap_or_default();
    let status = normalize_status(&meta);
    let post_type = match meta_string(&meta, "layout").as_deref() {
        Some(layout) if layout.trim().eq_ignore_ascii_case("page") => PostType::Page,
        _ => PostType::Post,
    };
    let categories = meta_get(&meta, "categories")
        .map(normalize_string_list)
        .unwrap_or_default();
    let tags = meta_get(&meta, "tags")
        .map(normalize_string_list)
        .unwrap_or_default();

    let asset_dir_name = assets::resolve_asset_dir(path, source_dir, asset_dir_names);

    let normalized = math::normalize_math_underscores(body.trim(), config.math.underscore);

    let mut warning = None;
    let (content, rewritten_image_links) = if config.assets.mode == AssetMode::Prefix {
        match &asset_dir_name {
            Some(dir) => links::rewrite_image_links(&normalized, dir, &config.assets.url_prefix),
            None => {
                if links::has_relative_image_links(&normalized) {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    warning =
                        Some(format!("{name} has relative images but no matched asset folder"));
                }
                (normalized, 0)
            }
        }
    } else {
        (normalized, 0)
    };

    let post = HexoPost {
        source_path: path.to_owned(),
        title,
        slug: slugify(&slug_source),
        date,
        updated,
        author,
        content,
        excerpt,
        categories,
        tags,
        status,
        post_type,
        asset_dir_name,
        rewritten_image_links,
    };
    Ok((post, warning))
}

/// Default title/slug stem: the file stem, except index/readme placeholders
/// nested in their own subdirectory take the directory name.
fn default_post_stem(path: &Path, source_dir: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if path.parent() != Some(source_dir)
        && matches!(stem.to_lowercase().as_str(), "index" | "readme")
        && let Some(parent) = path.parent().and_then(Path::file_name)
    {
        return parent.to_string_lossy().into_owned();
    }
    stem
}

/// Render a scalar metadata value as display text; null and blank values
/// count as absent.
fn meta_string(meta: &Mapping, key: &str) -> Option<String> {
    match meta_get(meta, key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Explicit status text wins; boolean `draft`/`published` flags come next;
/// everything else publishes.
fn normalize_status(meta: &Mapping) -> PostStatus {
    if let Some(status) = meta_get(meta, "status")
        .and_then(Value::as_str)
        .and_then(PostStatus::parse)
    {
        return status;
    }
    if meta_get(meta, "draft").and_then(Value::as_bool) == Some(true) {
        return PostStatus::Draft;
    }
    if meta_get(meta, "published").and_then(Value::as_bool) == Some(false) {
        return PostStatus::Draft;
    }
    PostStatus::Publish
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MathMode;
    use std::fs;

    fn write_post(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    fn collect(config: &ImportConfig, dir: &Path) -> (Vec<HexoPost>, Vec<String>) {
        collect_posts(config, dir).unwrap()
    }

    #[test]
    fn test_basic_post_with_dedup_tags_and_run_start_date() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "hello.md",
            "---\ntitle: Hello\ntags: [a, a, b]\n---\nbody text\n",
        );

        let before = Local::now().fixed_offset();
        let (posts, warnings) = collect(&ImportConfig::default(), root.path());
        let after = Local::now().fixed_offset();

        assert_eq!(posts.len(), 1);
        assert!(warnings.is_empty());
        let post = &posts[0];
        assert_eq!(post.title, "Hello");
        assert_eq!(post.slug, "hello");
        assert_eq!(post.tags, vec!["a", "b"]);
        assert_eq!(post.status, PostStatus::Publish);
        assert_eq!(post.post_type, PostType::Post);
        assert!(post.date >= before && post.date <= after);
        assert_eq!(post.updated, post.date);
    }

    #[test]
    fn test_drafts_filtered_unless_included() {
        let root = tempfile::tempdir().unwrap();
        write_post(root.path(), "a.md", "---\ntitle: A\ndraft: true\n---\nx");
        write_post(root.path(), "b.md", "---\ntitle: B\n---\nx");

        let mut config = ImportConfig::default();
        let (posts, _) = collect(&config, root.path());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "B");

        config.input.include_drafts = true;
        let (posts, _) = collect(&config, root.path());
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().any(|p| p.status == PostStatus::Draft));
    }

    #[test]
    fn test_published_false_means_draft() {
        let root = tempfile::tempdir().unwrap();
        write_post(root.path(), "a.md", "---\npublished: false\n---\nx");
        let (posts, _) = collect(&ImportConfig::default(), root.path());
        assert!(posts.is_empty());
    }

    #[test]
    fn test_sorted_by_date_undated_last() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "undated.md",
            "---\ntitle: Undated\n---\nx",
        );
        write_post(
            root.path(),
            "dated.md",
            "---\ntitle: Dated\ndate: 2020-05-01 10:00:00\n---\nx",
        );

        let (posts, _) = collect(&ImportConfig::default(), root.path());
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Dated", "Undated"]);
    }

    #[test]
    fn test_nested_index_takes_directory_name() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("my-post");
        fs::create_dir(&sub).unwrap();
        write_post(&sub, "index.md", "body only, no front matter");

        let (posts, _) = collect(&ImportConfig::default(), root.path());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "my-post");
        assert_eq!(posts[0].slug, "my-post");
        assert_eq!(posts[0].asset_dir_name.as_deref(), Some("my-post"));
    }

    #[test]
    fn test_image_rewrite_through_matched_asset_folder() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("pic-post")).unwrap();
        write_post(
            root.path(),
            "pic-post.md",
            "---\ntitle: Pics\n---\n![x](./img/a.png)\n",
        );

        let mut config = ImportConfig::default();
        config.assets.url_prefix = "/assets".to_owned();
        let (posts, warnings) = collect(&config, root.path());

        assert!(warnings.is_empty());
        assert_eq!(posts[0].rewritten_image_links, 1);
        assert!(posts[0].content.contains("(/assets/pic-post/img/a.png)"));
    }

    #[test]
    fn test_warning_for_relative_links_without_asset_folder() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "lonely.md",
            "---\ntitle: Lonely\n---\n![x](img/a.png)\n",
        );

        let (posts, warnings) = collect(&ImportConfig::default(), root.path());
        assert_eq!(posts[0].rewritten_image_links, 0);
        assert!(posts[0].content.contains("![x](img/a.png)"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("lonely.md"));
    }

    #[test]
    fn test_keep_mode_leaves_links_and_warns_never() {
        let root = tempfile::tempdir().unwrap();
        write_post(root.path(), "a.md", "---\ntitle: A\n---\n![x](img/a.png)");

        let mut config = ImportConfig::default();
        config.assets.mode = AssetMode::Keep;
        let (posts, warnings) = collect(&config, root.path());
        assert!(warnings.is_empty());
        assert!(posts[0].content.contains("![x](img/a.png)"));
    }

    #[test]
    fn test_math_mode_applies_to_body() {
        let root = tempfile::tempdir().unwrap();
        write_post(root.path(), "m.md", "---\ntitle: M\n---\nsee $x_1$ here");

        let mut config = ImportConfig::default();
        config.math.underscore = MathMode::Escaped;
        let (posts, _) = collect(&config, root.path());
        assert!(posts[0].content.contains(r"$x\_1$"));
    }

    #[test]
    fn test_page_layout_and_metadata_fields() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "about.md",
            "---\ntitle: About\nlayout: page\nslug: about-me\nauthor: alice\n\
             excerpt: short intro\ncategories: [life]\n---\nhello",
        );

        let (posts, _) = collect(&ImportConfig::default(), root.path());
        let post = &posts[0];
        assert_eq!(post.post_type, PostType::Page);
        assert_eq!(post.slug, "about-me");
        assert_eq!(post.author, "alice");
        assert_eq!(post.excerpt, "short intro");
        assert_eq!(post.categories, vec!["life"]);
    }

    #[test]
    fn test_updated_defaults_to_date() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "a.md",
            "---\ndate: 2021-02-03 04:05:06\n---\nx",
        );
        let (posts, _) = collect(&ImportConfig::default(), root.path());
        assert_eq!(posts[0].updated, posts[0].date);
    }

    #[test]
    fn test_non_markdown_files_ignored() {
        let root = tempfile::tempdir().unwrap();
        write_post(root.path(), "a.md", "---\ntitle: A\n---\nx");
        write_post(root.path(), "notes.txt", "not a post");
        write_post(root.path(), "b.MARKDOWN", "---\ntitle: B\n---\nx");

        let (posts, _) = collect(&ImportConfig::default(), root.path());
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn test_default_post_stem() {
        let source = PathBuf::from("/posts");
        assert_eq!(
            default_post_stem(Path::new("/posts/hello.md"), &source),
            "hello"
        );
        assert_eq!(
            default_post_stem(Path::new("/posts/dir/index.md"), &source),
            "dir"
        );
        assert_eq!(
            default_post_stem(Path::new("/posts/dir/README.md"), &source),
            "dir"
        );
        assert_eq!(
            default_post_stem(Path::new("/posts/index.md"), &source),
            "index"
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PostStatus::parse(" Private "), Some(PostStatus::Private));
        assert_eq!(PostStatus::parse("WAITING"), Some(PostStatus::Waiting));
        assert_eq!(PostStatus::parse("unknown"), None);
    }
}
