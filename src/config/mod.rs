//! Import configuration management for `hexport.toml`.
//!
//! # Sections
//!
//! | Section    | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `[input]`  | Hexo source directory, draft filter, parser     |
//! | `[output]` | Output SQL path and text encoding               |
//! | `[sql]`    | Table prefix, author, id ranges, truncation     |
//! | `[assets]` | Image link rewrite mode and URL prefix          |
//! | `[math]`   | MathJax underscore normalization mode           |
//!
//! # Example
//!
//! ```toml
//! [input]
//! source = "source/_posts"
//! include_drafts = false
//!
//! [sql]
//! table_prefix = "typecho_"
//! author = "admin"
//! author_id = 1
//!
//! [assets]
//! mode = "prefix"
//! url_prefix = "/hexo-assets"
//!
//! [math]
//! underscore = "escaped"
//! ```
//!
//! The file is optional: every field has a default and every field can be
//! overridden from the command line.

mod error;

pub mod defaults;

pub use error::ConfigError;

use crate::cli::Cli;
use anyhow::{Result, bail};
use clap::ValueEnum;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Mode Enums
// ============================================================================

/// Image link handling for relative asset URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AssetMode {
    /// Leave image links untouched.
    Keep,
    /// Rewrite relative links against the configured asset URL prefix.
    #[default]
    Prefix,
}

/// MathJax underscore normalization applied inside math regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MathMode {
    /// No rewriting at all.
    #[default]
    Keep,
    /// `\_` becomes `_` inside math regions.
    Underscore,
    /// `_` becomes `\_` inside math regions.
    Escaped,
}

/// Front-matter parsing strategy, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FrontMatterEngine {
    /// Full YAML parse first, minimal-subset parser as fallback.
    #[default]
    BestEffort,
    /// Minimal-subset parser only.
    MinimalSubset,
}

/// Output text encoding for the generated SQL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputEncoding {
    /// Plain UTF-8.
    #[default]
    Utf8,
    /// UTF-8 with a leading byte-order mark.
    Utf8Bom,
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing hexport.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Source tree settings
    #[serde(default)]
    pub input: InputConfig,

    /// Output file settings
    #[serde(default)]
    pub output: OutputConfig,

    /// SQL emission settings
    #[serde(default)]
    pub sql: SqlConfig,

    /// Asset link rewriting settings
    #[serde(default)]
    pub assets: AssetConfig,

    /// Math normalization settings
    #[serde(default)]
    pub math: MathConfig,
}

/// `[input]` section - where posts come from.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Hexo post directory. When it points at a Hexo `source/` root that
    /// holds a `_posts/` subdirectory and no top-level markdown, `_posts`
    /// is targeted automatically.
    #[serde(default = "defaults::input::source")]
    #[educe(Default = defaults::input::source())]
    pub source: PathBuf,

    /// Include draft/unpublished posts in the output.
    #[serde(default)]
    pub include_drafts: bool,

    /// Front-matter parsing strategy.
    #[serde(default)]
    pub front_matter: FrontMatterEngine,
}

/// `[output]` section - where and how the SQL file is written.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output SQL path.
    #[serde(default = "defaults::output::path")]
    #[educe(Default = defaults::output::path())]
    pub path: PathBuf,

    /// Output text encoding.
    #[serde(default)]
    pub encoding: OutputEncoding,
}

/// `[sql]` section - Typecho table and id layout.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SqlConfig {
    /// Typecho table prefix, normalized to always end with `_`.
    #[serde(default = "defaults::sql::table_prefix")]
    #[educe(Default = defaults::sql::table_prefix())]
    pub table_prefix: String,

    /// Default author name when front matter has none.
    #[serde(default = "defaults::sql::author")]
    #[educe(Default = defaults::sql::author())]
    pub author: String,

    /// Typecho authorId for imported posts. Must be >= 1.
    #[serde(default = "defaults::sql::author_id")]
    #[educe(Default = defaults::sql::author_id())]
    pub author_id: u32,

    /// Starting cid for generated contents rows.
    #[serde(default = "defaults::sql::cid_start")]
    #[educe(Default = defaults::sql::cid_start())]
    pub cid_start: u32,

    /// Starting mid for generated metas rows.
    #[serde(default = "defaults::sql::mid_start")]
    #[educe(Default = defaults::sql::mid_start())]
    pub mid_start: u32,

    /// Emit DELETE statements clearing the target tables before import.
    #[serde(default)]
    pub truncate: bool,
}

/// `[assets]` section - relative image link rewriting.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct AssetConfig {
    /// Rewrite mode for relative image links.
    #[serde(default)]
    pub mode: AssetMode,

    /// URL prefix that rewritten asset paths are joined against.
    #[serde(default = "defaults::assets::url_prefix")]
    #[educe(Default = defaults::assets::url_prefix())]
    pub url_prefix: String,
}

/// `[math]` section - MathJax normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MathConfig {
    /// Underscore normalization mode inside math regions.
    #[serde(default)]
    pub underscore: MathMode,
}

impl ImportConfig {
    /// Load configuration from a toml file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        let mut config: Self = toml::from_str(&raw)?;
        config.config_path = path.to_owned();
        Ok(config)
    }

    /// Apply command-line overrides on top of file/default values.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some(source) = &cli.source {
            self.input.source = source.clone();
        }
        if cli.include_drafts {
            self.input.include_drafts = true;
        }
        if let Some(engine) = cli.front_matter {
            self.input.front_matter = engine;
        }

        if let Some(output) = &cli.output {
            self.output.path = output.clone();
        }
        if let Some(encoding) = cli.encoding {
            self.output.encoding = encoding;
        }

        if let Some(prefix) = &cli.table_prefix {
            self.sql.table_prefix = prefix.clone();
        }
        if let Some(author) = &cli.author {
            self.sql.author = author.clone();
        }
        if let Some(author_id) = cli.author_id {
            self.sql.author_id = author_id;
        }
        if let Some(cid_start) = cli.cid_start {
            self.sql.cid_start = cid_start;
        }
        if let Some(mid_start) = cli.mid_start {
            self.sql.mid_start = mid_start;
        }
        if cli.truncate {
            self.sql.truncate = true;
        }

        if let Some(mode) = cli.asset_mode {
            self.assets.mode = mode;
        }
        if let Some(prefix) = &cli.asset_url_prefix {
            self.assets.url_prefix = prefix.clone();
        }

        if let Some(mode) = cli.math_underscore_mode {
            self.math.underscore = mode;
        }
    }

    /// Validate configuration before any processing begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sql.author_id < 1 {
            return Err(ConfigError::Validation(
                "sql.author_id must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the post source directory.
    ///
    /// Expands `~`, auto-targets a `_posts/` subdirectory when the
    /// configured path is a Hexo `source/` root without top-level markdown,
    /// and fails when the resulting directory does not exist.
    pub fn resolve_source_dir(&self) -> Result<PathBuf> {
        let expanded = expand_path(&self.input.source);
        let mut source = expanded;

        let is_posts_dir = source
            .file_name()
            .is_some_and(|name| name.eq_ignore_ascii_case("_posts"));
        let posts_candidate = source.join("_posts");
        if !is_posts_dir && posts_candidate.is_dir() && !has_top_level_markdown(&source) {
            source = posts_candidate;
        }

        if !source.is_dir() {
            bail!("source directory does not exist: {}", source.display());
        }
        Ok(source)
    }

    /// Resolve the output SQL path (tilde-expanded).
    pub fn resolve_output_path(&self) -> PathBuf {
        expand_path(&self.output.path)
    }
}

/// Expand `~` in a configured path.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

/// Whether a directory holds markdown files directly (non-recursive).
fn has_top_level_markdown(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|entry| {
        let path = entry.path();
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown")
                })
    })
}
