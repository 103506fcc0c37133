//! Typecho SQL emission.
//!
//! Serializes assembled posts into one MySQL/MariaDB script targeting the
//! Typecho schema: `contents` rows with sequential cids, deduplicated
//! category/tag `metas` rows sharing one mid counter, `relationships`
//! pairs, and `AUTO_INCREMENT` resets pointing one past the highest
//! assigned id. The whole document is built in memory and wrapped in a
//! single transaction.

pub mod escape;

use crate::config::ImportConfig;
use crate::post::HexoPost;
use crate::post::date::to_unix_timestamp;
use crate::utils::{dedupe, slugify};
use escape::{normalize_table_prefix, quote_str};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Marker Typecho requires at the start of markdown content.
const MARKDOWN_MARKER: &str = "<!--markdown-->";
/// Excerpt/body separator recognized by Typecho.
const MORE_MARKER: &str = "<!--more-->";

// ============================================================================
// Terms
// ============================================================================

/// Which meta table kind a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metas row. Identity is the (kind, name) pair; the first occurrence
/// across all posts allocates the mid, later occurrences bump the count.
#[derive(Debug, Clone)]
pub struct Term {
    pub mid: u32,
    pub name: String,
    pub slug: String,
    pub kind: TermKind,
    pub count: u32,
}

// ============================================================================
// Emission
// ============================================================================

/// Merge excerpt and body and ensure the markdown marker prefix.
///
/// A body that already contains a more-tag keeps the excerpt out (the body
/// is assumed to carry its own summary).
fn compose_text(content: &str, excerpt: &str) -> String {
    let body = content.trim();
    let summary = excerpt.trim();

    let merged = if summary.is_empty() || body.contains(MORE_MARKER) {
        body.to_owned()
    } else if body.is_empty() {
        summary.to_owned()
    } else {
        format!("{summary}\n\n{MORE_MARKER}\n\n{body}")
    };

    if merged.starts_with(MARKDOWN_MARKER) {
        merged
    } else {
        format!("{MARKDOWN_MARKER}{merged}")
    }
}

/// Build the complete SQL import script for an ordered post batch.
pub fn build_sql(posts: &[HexoPost], config: &ImportConfig) -> String {
    let prefix = normalize_table_prefix(&config.sql.table_prefix);
    let author_id = config.sql.author_id.max(1);
    let mut next_cid = config.sql.cid_start.max(1);
    let mut next_mid = config.sql.mid_start.max(1);

    let mut content_lines: Vec<String> = Vec::with_capacity(posts.len());
    let mut term_index: FxHashMap<(TermKind, String), usize> = FxHashMap::default();
    let mut terms: Vec<Term> = Vec::new();
    let mut relationships: Vec<(u32, u32)> = Vec::new();
    let mut relation_seen: FxHashSet<(u32, u32)> = FxHashSet::default();

    for post in posts {
        let cid = next_cid;
        next_cid += 1;

        content_lines.push(format!(
            "INSERT INTO `{prefix}contents` \
             (`cid`,`title`,`slug`,`created`,`modified`,`text`,`order`,`authorId`,`template`,\
             `type`,`status`,`password`,`commentsNum`,`allowComment`,`allowPing`,`allowFeed`,\
             `parent`) VALUES ({cid},{title},{slug},{created},{modified},{text},0,{author_id},\
             NULL,{post_type},{status},NULL,0,'1','1','1',0);",
            title = quote_str(&post.title),
            slug = quote_str(&post.slug),
            created = to_unix_timestamp(post.date),
            modified = to_unix_timestamp(post.updated),
            text = quote_str(&compose_text(&post.content, &post.excerpt)),
            post_type = quote_str(post.post_type.as_str()),
            status = quote_str(post.status.as_str()),
        ));

        // Categories first, then tags; both share the mid counter.
        let groups = [
            (TermKind::Category, &post.categories),
            (TermKind::Tag, &post.tags),
        ];
        for (kind, names) in groups {
            for name in dedupe(names.iter().cloned()) {
                let index = *term_index.entry((kind, name.clone())).or_insert_with(|| {
                    terms.push(Term {
                        mid: next_mid,
                        slug: slugify(&name),
                        name,
                        kind,
                        count: 0,
                    });
                    next_mid += 1;
                    terms.len() - 1
                });
                terms[index].count += 1;

                let relation = (cid, terms[index].mid);
                if relation_seen.insert(relation) {
                    relationships.push(relation);
                }
            }
        }
    }

    let mut lines: Vec<String> = vec![
        "-- Generated by hexport".to_owned(),
        "-- Import target: Typecho (MySQL/MariaDB)".to_owned(),
        "SET NAMES utf8mb4;".to_owned(),
        "START TRANSACTION;".to_owned(),
    ];

    if config.sql.truncate {
        // Reverse dependency order.
        lines.push(format!("DELETE FROM `{prefix}relationships`;"));
        lines.push(format!("DELETE FROM `{prefix}metas`;"));
        lines.push(format!("DELETE FROM `{prefix}contents`;"));
    }

    lines.push(String::new());
    lines.push("-- Contents".to_owned());
    lines.extend(content_lines);

    lines.push(String::new());
    lines.push("-- Metas (categories/tags)".to_owned());
    for term in &terms {
        lines.push(format!(
            "INSERT INTO `{prefix}metas` \
             (`mid`,`name`,`slug`,`type`,`description`,`count`,`order`,`parent`) \
             VALUES ({mid},{name},{slug},{kind},'',{count},0,0);",
            mid = term.mid,
            name = quote_str(&term.name),
            slug = quote_str(&term.slug),
            kind = quote_str(term.kind.as_str()),
            count = term.count,
        ));
    }

    lines.push(String::new());
    lines.push("-- Relationships".to_owned());
    for (cid, mid) in &relationships {
        lines.push(format!(
            "INSERT INTO `{prefix}relationships` (`cid`,`mid`) VALUES ({cid},{mid});"
        ));
    }

    // One past the highest assigned id, or the configured start when the
    // table received no rows.
    let next_contents_ai = if posts.is_empty() {
        config.sql.cid_start.max(1)
    } else {
        next_cid
    };
    let next_metas_ai = if terms.is_empty() {
        config.sql.mid_start.max(1)
    } else {
        next_mid
    };

    lines.push(String::new());
    lines.push(format!(
        "ALTER TABLE `{prefix}contents` AUTO_INCREMENT = {next_contents_ai};"
    ));
    lines.push(format!(
        "ALTER TABLE `{prefix}metas` AUTO_INCREMENT = {next_metas_ai};"
    ));
    lines.push("COMMIT;".to_owned());
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::date::parse_date_str;
    use crate::post::{PostStatus, PostType};
    use std::path::PathBuf;

    fn make_post(title: &str, categories: &[&str], tags: &[&str]) -> HexoPost {
        let date = parse_date_str("2023-01-01 12:00:00").unwrap();
        HexoPost {
            source_path: PathBuf::from(format!("{title}.md")),
            title: title.to_owned(),
            slug: slugify(title),
            date,
            updated: date,
            author: "admin".to_owned(),
            content: "body".to_owned(),
            excerpt: String::new(),
            categories: categories.iter().map(|s| (*s).to_owned()).collect(),
            tags: tags.iter().map(|s| (*s).to_owned()).collect(),
            status: PostStatus::Publish,
            post_type: PostType::Post,
            asset_dir_name: None,
            rewritten_image_links: 0,
        }
    }

    fn count_lines(sql: &str, needle: &str) -> usize {
        sql.lines().filter(|line| line.contains(needle)).count()
    }

    #[test]
    fn test_scenario_single_post_with_duplicate_tags() {
        let posts = vec![make_post("Hello", &[], &["a", "a", "b"])];
        let sql = build_sql(&posts, &ImportConfig::default());

        assert_eq!(count_lines(&sql, "INSERT INTO `typecho_contents`"), 1);
        assert_eq!(count_lines(&sql, "INSERT INTO `typecho_metas`"), 2);
        assert_eq!(count_lines(&sql, "INSERT INTO `typecho_relationships`"), 2);
        assert!(sql.contains("'Hello'"));
        assert!(sql.contains("(1,'a','a','tag','',1,0,0)"));
        assert!(sql.contains("(2,'b','b','tag','',1,0,0)"));
    }

    #[test]
    fn test_term_ids_monotonic_across_kinds_and_posts() {
        let posts = vec![
            make_post("One", &["cat1"], &["t1", "t2"]),
            make_post("Two", &["cat2"], &["t1"]),
        ];
        let mut config = ImportConfig::default();
        config.sql.mid_start = 10;
        let sql = build_sql(&posts, &config);

        // First-seen order: cat1, t1, t2, cat2; categories and tags share
        // one counter.
        assert!(sql.contains("(10,'cat1','cat1','category'"));
        assert!(sql.contains("(11,'t1','t1','tag','',2,0,0)"));
        assert!(sql.contains("(12,'t2','t2','tag','',1,0,0)"));
        assert!(sql.contains("(13,'cat2','cat2','category'"));
        assert!(sql.contains("AUTO_INCREMENT = 14;"));
    }

    #[test]
    fn test_relationships_deduped_after_whitespace_normalization() {
        let posts = vec![make_post("One", &[], &["rust", " rust ", "rust"])];
        let sql = build_sql(&posts, &ImportConfig::default());

        assert_eq!(count_lines(&sql, "INSERT INTO `typecho_metas`"), 1);
        assert_eq!(count_lines(&sql, "INSERT INTO `typecho_relationships`"), 1);
        assert!(sql.contains("'rust','rust','tag','',1,0,0"));
    }

    #[test]
    fn test_cid_sequence_and_auto_increment() {
        let posts = vec![make_post("A", &[], &[]), make_post("B", &[], &[])];
        let mut config = ImportConfig::default();
        config.sql.cid_start = 100;
        let sql = build_sql(&posts, &config);

        assert!(sql.contains("VALUES (100,'A'"));
        assert!(sql.contains("VALUES (101,'B'"));
        assert!(sql.contains("ALTER TABLE `typecho_contents` AUTO_INCREMENT = 102;"));
    }

    #[test]
    fn test_empty_batch_resets_to_start_values() {
        let mut config = ImportConfig::default();
        config.sql.cid_start = 5;
        config.sql.mid_start = 7;
        let sql = build_sql(&[], &config);

        assert_eq!(count_lines(&sql, "INSERT INTO"), 0);
        assert!(sql.contains("ALTER TABLE `typecho_contents` AUTO_INCREMENT = 5;"));
        assert!(sql.contains("ALTER TABLE `typecho_metas` AUTO_INCREMENT = 7;"));
    }

    #[test]
    fn test_truncate_in_reverse_dependency_order() {
        let mut config = ImportConfig::default();
        config.sql.truncate = true;
        let sql = build_sql(&[], &config);

        let rel = sql.find("DELETE FROM `typecho_relationships`;").unwrap();
        let metas = sql.find("DELETE FROM `typecho_metas`;").unwrap();
        let contents = sql.find("DELETE FROM `typecho_contents`;").unwrap();
        assert!(rel < metas && metas < contents);
    }

    #[test]
    fn test_transaction_wrapping() {
        let sql = build_sql(&[], &ImportConfig::default());
        let start = sql.find("START TRANSACTION;").unwrap();
        let commit = sql.find("COMMIT;").unwrap();
        assert!(sql.starts_with("-- Generated by hexport"));
        assert!(sql.contains("SET NAMES utf8mb4;"));
        assert!(start < commit);
        assert!(sql.ends_with("COMMIT;\n"));
    }

    #[test]
    fn test_table_prefix_normalized() {
        let mut config = ImportConfig::default();
        config.sql.table_prefix = "blog".to_owned();
        let sql = build_sql(&[make_post("A", &[], &[])], &config);
        assert!(sql.contains("INSERT INTO `blog_contents`"));
    }

    #[test]
    fn test_escaping_flows_into_statements() {
        let mut post = make_post("It's \"quoted\"", &[], &[]);
        post.content = "line1\nline2".to_owned();
        let sql = build_sql(&[post], &ImportConfig::default());
        assert!(sql.contains(r#"'It\'s "quoted"'"#));
        assert!(sql.contains(r"line1\nline2"));
    }

    #[test]
    fn test_compose_text_marker_and_excerpt_merge() {
        assert_eq!(compose_text("body", ""), "<!--markdown-->body");
        assert_eq!(
            compose_text("body", "summary"),
            "<!--markdown-->summary\n\n<!--more-->\n\nbody"
        );
        // Body with its own more-tag keeps the excerpt out.
        assert_eq!(
            compose_text("intro\n<!--more-->\nrest", "summary"),
            "<!--markdown-->intro\n<!--more-->\nrest"
        );
        assert_eq!(compose_text("", "summary"), "<!--markdown-->summary");
        assert_eq!(
            compose_text("<!--markdown-->already", ""),
            "<!--markdown-->already"
        );
    }

    #[test]
    fn test_page_type_and_status_columns() {
        let mut post = make_post("About", &[], &[]);
        post.post_type = PostType::Page;
        post.status = PostStatus::Private;
        let sql = build_sql(&[post], &ImportConfig::default());
        assert!(sql.contains("'page','private'"));
    }
}
