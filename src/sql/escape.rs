//! MySQL string-literal escaping and table-prefix normalization.

/// Quote a string as a MySQL literal.
///
/// Escapes backslash, NUL, newline, carriage return, tab, Ctrl-Z and single
/// quote, then wraps the result in single quotes.
pub fn quote_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Normalize a table prefix so it always ends with `_`; blank falls back to
/// the Typecho default.
pub fn normalize_table_prefix(prefix: &str) -> String {
    let cleaned = prefix.trim();
    if cleaned.is_empty() {
        return "typecho_".to_owned();
    }
    if cleaned.ends_with('_') {
        cleaned.to_owned()
    } else {
        format!("{cleaned}_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote_str("hello"), "'hello'");
        assert_eq!(quote_str(""), "''");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote_str("it's"), r"'it\'s'");
        assert_eq!(quote_str("a\\b"), r"'a\\b'");
        assert_eq!(quote_str("line\nbreak"), r"'line\nbreak'");
        assert_eq!(quote_str("tab\there"), r"'tab\there'");
        assert_eq!(quote_str("cr\rhere"), r"'cr\rhere'");
        assert_eq!(quote_str("nul\0here"), r"'nul\0here'");
        assert_eq!(quote_str("sub\u{1a}here"), r"'sub\Zhere'");
    }

    #[test]
    fn test_quote_keeps_unicode() {
        assert_eq!(quote_str("中文 émoji 🎉"), "'中文 émoji 🎉'");
    }

    #[test]
    fn test_normalize_table_prefix() {
        assert_eq!(normalize_table_prefix("typecho_"), "typecho_");
        assert_eq!(normalize_table_prefix("blog"), "blog_");
        assert_eq!(normalize_table_prefix("  blog_  "), "blog_");
        assert_eq!(normalize_table_prefix(""), "typecho_");
        assert_eq!(normalize_table_prefix("   "), "typecho_");
    }
}
