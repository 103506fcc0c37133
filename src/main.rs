//! hexport - Convert Hexo markdown posts to a Typecho SQL import file.

mod cli;
mod config;
mod logger;
mod post;
mod sql;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::{AssetMode, ImportConfig, OutputEncoding};
use std::fs;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static ImportConfig = Box::leak(Box::new(load_config(cli)?));
    run(config)
}

/// Load and validate configuration from the optional config file plus CLI
/// overrides.
fn load_config(cli: &'static Cli) -> Result<ImportConfig> {
    let mut config = if cli.config.exists() {
        ImportConfig::from_path(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?
    } else {
        ImportConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}

/// Run the whole migration: collect posts, build the SQL document in
/// memory, write it out once, print the summary.
fn run(config: &'static ImportConfig) -> Result<()> {
    let source_dir = config.resolve_source_dir()?;
    let output_path = config.resolve_output_path();

    let (posts, warnings) = post::collect_posts(config, &source_dir)?;
    let sql_text = sql::build_sql(&posts, config);

    let output = match config.output.encoding {
        OutputEncoding::Utf8 => sql_text,
        OutputEncoding::Utf8Bom => format!("\u{feff}{sql_text}"),
    };
    fs::write(&output_path, output)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    let matched_asset_dirs = posts.iter().filter(|p| p.asset_dir_name.is_some()).count();
    let rewritten_links: usize = posts.iter().map(|p| p.rewritten_image_links).sum();

    log!("posts"; "converted {} posts", posts.len());
    log!("sql"; "output written to {}", output_path.display());
    log!("assets"; "matched asset folders: {}/{}", matched_asset_dirs, posts.len());
    if config.assets.mode == AssetMode::Prefix {
        log!("assets"; "rewritten image links: {rewritten_links}");
    }

    if !warnings.is_empty() {
        log!("warn"; "{} posts have relative image links but no matched asset folder", warnings.len());
        for warning in warnings.iter().take(20) {
            log!("warn"; "  - {warning}");
        }
        if warnings.len() > 20 {
            log!("warn"; "  ... and {} more", warnings.len() - 20);
        }
    }

    if posts.is_empty() {
        log!("warn"; "no posts found, check the configured source directory");
    }
    Ok(())
}
