//! Terminal logging with colored module prefixes.
//!
//! Provides the `log!` macro for formatted output with a colored
//! `[module]` prefix:
//!
//! ```ignore
//! log!("posts"; "converted {} posts", count);
//! log!("warn"; "{} posts have unmatched asset folders", n);
//! ```

use colored::{ColoredString, Colorize};
use std::io::{Write, stdout};

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
///
/// Multiline messages keep the prefix on the first line only.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = prefix_text(module);
    match module.to_ascii_lowercase().as_str() {
        "sql" => prefix.bright_blue().bold(),
        "posts" | "assets" => prefix.bright_green().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Plain `[module]` prefix text before coloring.
#[inline]
fn prefix_text(module: &str) -> String {
    format!("[{module}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_text_brackets() {
        assert_eq!(prefix_text("posts"), "[posts]");
        assert_eq!(prefix_text(""), "[]");
    }

    #[test]
    fn test_colorize_prefix_keeps_module_name() {
        for module in ["posts", "sql", "warn", "anything"] {
            let colored = colorize_prefix(module);
            assert!(colored.to_string().contains(module));
        }
    }
}
