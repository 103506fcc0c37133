//! Command-line interface definitions.
//!
//! Defines all CLI arguments using clap. Every flag overrides the
//! corresponding `hexport.toml` field; the file itself is optional.

use crate::config::{AssetMode, FrontMatterEngine, MathMode, OutputEncoding};
use clap::Parser;
use std::path::PathBuf;

/// Hexo to Typecho SQL migration CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Hexo post directory (default: source/_posts)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output SQL path (default: typecho_import.sql)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Typecho table prefix (default: typecho_)
    #[arg(long)]
    pub table_prefix: Option<String>,

    /// Default author name when front matter has no author
    #[arg(long)]
    pub author: Option<String>,

    /// Typecho authorId for imported posts (default: 1)
    #[arg(long)]
    pub author_id: Option<u32>,

    /// Include draft/unpublished posts
    #[arg(long)]
    pub include_drafts: bool,

    /// Add DELETE statements to clear contents/metas/relationships before import
    #[arg(long)]
    pub truncate: bool,

    /// Starting cid for generated contents rows (default: 1)
    #[arg(long)]
    pub cid_start: Option<u32>,

    /// Starting mid for generated metas rows (default: 1)
    #[arg(long)]
    pub mid_start: Option<u32>,

    /// Image link mode: keep original links or rewrite by asset URL prefix
    #[arg(long, value_enum)]
    pub asset_mode: Option<AssetMode>,

    /// URL prefix for asset folders when --asset-mode=prefix
    #[arg(long)]
    pub asset_url_prefix: Option<String>,

    /// MathJax underscore normalization: keep, '\_' -> '_', or '_' -> '\_'
    #[arg(long, value_enum)]
    pub math_underscore_mode: Option<MathMode>,

    /// Front-matter parsing strategy
    #[arg(long, value_enum)]
    pub front_matter: Option<FrontMatterEngine>,

    /// Output SQL encoding
    #[arg(long, value_enum)]
    pub encoding: Option<OutputEncoding>,

    /// Config file name
    #[arg(short = 'C', long, default_value = "hexport.toml")]
    pub config: PathBuf,
}
