//! Front-matter extraction and parsing.
//!
//! A post starts with an optional metadata block delimited by `---` lines:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [a, b]
//! ---
//! body text
//! ```
//!
//! Parsing runs through a strategy selected once per run: the best-effort
//! engine tries a full YAML parse and falls back to a minimal-subset parser
//! on failure, the minimal engine skips YAML entirely. Both produce a
//! `serde_yaml::Mapping` so downstream code is engine-agnostic.

use crate::config::FrontMatterEngine;
use crate::utils::{dedupe, strip_bom};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;

/// Front-matter block delimiter line.
const FRONT_MATTER_BOUNDARY: &str = "---";

static RE_KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_-]+):(?:\s*(.*))?$").unwrap());
static RE_LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*-\s*(.+?)\s*$").unwrap());
static RE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());
static RE_DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").unwrap());

/// Splits raw post text into metadata and body using the configured engine.
pub struct FrontMatterParser {
    engine: FrontMatterEngine,
}

impl FrontMatterParser {
    pub fn new(engine: FrontMatterEngine) -> Self {
        Self { engine }
    }

    /// Split raw file text into (metadata, body).
    ///
    /// Without a leading delimiter line the whole text is body and metadata
    /// is empty. A missing closing delimiter is treated as malformed: the
    /// entire text stays in the body so nothing is silently dropped.
    pub fn split(&self, raw: &str) -> (Mapping, String) {
        let normalized = strip_bom(raw).replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<&str> = normalized.split('\n').collect();

        if lines.first().map(|l| l.trim()) != Some(FRONT_MATTER_BOUNDARY) {
            return (Mapping::new(), normalized);
        }

        let Some(end_index) = lines[1..]
            .iter()
            .position(|l| l.trim() == FRONT_MATTER_BOUNDARY)
            .map(|i| i + 1)
        else {
            return (Mapping::new(), normalized);
        };

        let front_text = lines[1..end_index].join("\n");
        let body = lines[end_index + 1..]
            .join("\n")
            .trim_start_matches('\n')
            .to_owned();

        (self.parse_block(&front_text), body)
    }

    /// Parse a front-matter block into a mapping.
    fn parse_block(&self, front_text: &str) -> Mapping {
        match self.engine {
            FrontMatterEngine::BestEffort => {
                if let Ok(Value::Mapping(mapping)) = serde_yaml::from_str::<Value>(front_text) {
                    return mapping;
                }
                parse_minimal(front_text)
            }
            FrontMatterEngine::MinimalSubset => parse_minimal(front_text),
        }
    }
}

/// Look up a mapping entry by string key.
pub fn meta_get<'a>(meta: &'a Mapping, key: &str) -> Option<&'a Value> {
    meta.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

// ============================================================================
// Minimal-Subset Parser
// ============================================================================

/// Hand-rolled parser covering the front-matter shapes blogs actually use:
/// `key: value` scalars, indented `- item` lists, inline `[a, b]` lists, and
/// comma-separated inline lists for `tags`/`categories`.
fn parse_minimal(front_text: &str) -> Mapping {
    let mut data = Mapping::new();
    let mut current_key: Option<String> = None;

    for raw_line in front_text.lines() {
        let stripped = raw_line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        if let Some(key) = current_key.clone()
            && let Some(caps) = RE_LIST_ITEM.captures(raw_line)
        {
            let mut items = match meta_get(&data, &key) {
                Some(Value::Sequence(seq)) => seq.clone(),
                Some(other) => normalize_string_list(other)
                    .into_iter()
                    .map(Value::String)
                    .collect(),
                None => Vec::new(),
            };
            let map_key = Value::String(key);
            items.push(parse_scalar(&caps[1]));
            data.insert(map_key, Value::Sequence(items));
            continue;
        }

        // Unrecognized lines reset list continuation, so stray items of an
        // unrelated key cannot attach to a previous bare list.
        let Some(caps) = RE_KEY_VALUE.captures(stripped) else {
            current_key = None;
            continue;
        };

        let key = caps[1].to_owned();
        let value_raw = caps.get(2).map_or("", |m| m.as_str()).trim();
        current_key = Some(key.clone());
        let map_key = Value::String(key.clone());

        if value_raw.is_empty() {
            data.insert(map_key, Value::Sequence(Vec::new()));
            continue;
        }

        if value_raw.starts_with('[') && value_raw.ends_with(']') {
            let inside = value_raw[1..value_raw.len() - 1].trim();
            let items = if inside.is_empty() {
                Vec::new()
            } else {
                inside
                    .split(',')
                    .map(|part| parse_scalar(part.trim()))
                    .collect()
            };
            data.insert(map_key, Value::Sequence(items));
            continue;
        }

        if matches!(key.as_str(), "tags" | "categories") && value_raw.contains(',') {
            let items = value_raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(parse_scalar)
                .collect();
            data.insert(map_key, Value::Sequence(items));
            continue;
        }

        data.insert(map_key, parse_scalar(value_raw));
    }

    data
}

/// Coerce a scalar literal: unwrap quotes, recognize booleans, nulls and
/// numeric literals, keep everything else as text.
fn parse_scalar(value: &str) -> Value {
    let mut text = value.trim();
    if text.is_empty() {
        return Value::String(String::new());
    }

    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] && matches!(bytes[0], b'\'' | b'"') {
        text = &text[1..text.len() - 1];
    }

    match text.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "none" | "~" => return Value::Null,
        _ => {}
    }

    if RE_INTEGER.is_match(text)
        && let Ok(n) = text.parse::<i64>()
    {
        return Value::from(n);
    }
    if RE_DECIMAL.is_match(text)
        && let Ok(n) = text.parse::<f64>()
    {
        return Value::from(n);
    }

    Value::String(text.to_owned())
}

// ============================================================================
// List Normalization
// ============================================================================

/// Flatten any of the shapes a list-valued field can take (scalar, inline
/// bracket string, sequence, mapping with a `name` field, or nesting of
/// those) into an ordered, deduplicated list of trimmed non-empty strings.
pub fn normalize_string_list(value: &Value) -> Vec<String> {
    let mut flattened = Vec::new();
    flatten_value(value, &mut flattened);
    dedupe(flattened)
}

fn flatten_value(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::String(s) => {
            let stripped = s.trim();
            if stripped.is_empty() {
                return;
            }
            if stripped.starts_with('[') && stripped.ends_with(']') {
                let inner = stripped[1..stripped.len() - 1].trim();
                for part in inner.split(',') {
                    let part = part.trim().trim_matches(|c| c == '\'' || c == '"');
                    if !part.is_empty() {
                        out.push(part.to_owned());
                    }
                }
                return;
            }
            out.push(stripped.to_owned());
        }
        Value::Sequence(seq) => {
            for item in seq {
                flatten_value(item, out);
            }
        }
        Value::Mapping(map) => {
            if let Some(name) = meta_get(map, "name") {
                flatten_value(name, out);
                return;
            }
            for (_, item) in map {
                flatten_value(item, out);
            }
        }
        Value::Tagged(tagged) => flatten_value(&tagged.value, out),
    }
}
