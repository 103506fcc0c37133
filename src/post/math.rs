//! MathJax underscore normalization with code-aware masking.
//!
//! Markdown renderers eat bare `_` as emphasis inside math, so blogs end up
//! with a mix of `x_1` and `x\_1` depending on the renderer they targeted.
//! This module rewrites underscore escaping inside math regions only, while
//! code regions stay byte-for-byte untouched.
//!
//! # Pipeline
//!
//! ```text
//! raw ──► mask fenced code ──► mask inline code ──► protect math regions
//!                                                   ($$..$$, \[..\], \(..\))
//!     ◄── restore ◄───────────────────────────────── rewrite inline $..$
//! ```
//!
//! Masking uses an alternating literal/protected segment list over a side
//! table instead of in-band placeholder strings, so no source text can ever
//! collide with a masking token and restoration is trivially lossless. One
//! consequence: a math region can never span a code span, which also means
//! code is never interpreted as math.

use crate::config::MathMode;

// ============================================================================
// Masked Document
// ============================================================================

/// One piece of a masked document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal text still visible to later passes.
    Text(String),
    /// Index into the protected side table.
    Protected(usize),
}

/// A document split into literal and protected segments.
///
/// Concatenating all segments (protected ones resolved through the side
/// table) always reproduces a full document; passes only ever rewrite or
/// split `Text` segments.
#[derive(Debug, Default)]
struct MaskedDocument {
    segments: Vec<Segment>,
    protected: Vec<String>,
}

impl MaskedDocument {
    fn push_text(&mut self, text: String) {
        if !text.is_empty() {
            self.segments.push(Segment::Text(text));
        }
    }

    fn push_protected(&mut self, raw: String) {
        self.protected.push(raw);
        self.segments.push(Segment::Protected(self.protected.len() - 1));
    }

    /// Re-split every text segment through `split`, which appends new
    /// segments and may push onto the protected side table.
    fn resegment(&mut self, mut split: impl FnMut(&str, &mut Vec<String>, &mut Vec<Segment>)) {
        let old = std::mem::take(&mut self.segments);
        for segment in old {
            match segment {
                Segment::Protected(index) => self.segments.push(Segment::Protected(index)),
                Segment::Text(text) => {
                    let mut produced = Vec::new();
                    split(&text, &mut self.protected, &mut produced);
                    self.segments.extend(produced);
                }
            }
        }
    }

    /// Concatenate everything back into plain text.
    fn restore(self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Protected(index) => out.push_str(&self.protected[*index]),
            }
        }
        out
    }
}

// ============================================================================
// Public Entry Point
// ============================================================================

/// Normalize underscore escaping inside math regions of a markdown document.
///
/// Mode `Keep` is a no-op. Fenced code blocks and inline code spans are
/// protected before any math detection happens.
pub fn normalize_math_underscores(markdown: &str, mode: MathMode) -> String {
    if mode == MathMode::Keep || markdown.is_empty() {
        return markdown.to_owned();
    }

    let mut doc = MaskedDocument::default();
    mask_fenced_code_blocks(markdown, &mut doc);
    mask_inline_code_spans(&mut doc);

    // Math regions in priority order; each pass only sees text the earlier
    // passes left unprotected.
    mask_math_pass(&mut doc, "$$", "$$", true, mode);
    mask_math_pass(&mut doc, "\\[", "\\]", false, mode);
    mask_math_pass(&mut doc, "\\(", "\\)", false, mode);
    rewrite_inline_dollar_math(&mut doc, mode);

    doc.restore()
}

// ============================================================================
// Code Masking
// ============================================================================

/// Detect a fence opener: optional indentation, then three-or-more
/// backticks or tildes (an info string may follow).
fn fence_open(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let fence_char = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let run = trimmed.chars().take_while(|&c| c == fence_char).count();
    (run >= 3).then_some((fence_char, run))
}

/// Detect a fence closer: at least as many of the same fence character,
/// nothing but whitespace after.
fn fence_close(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let run = trimmed.chars().take_while(|&c| c == fence_char).count();
    run >= fence_len
        && trimmed[run..]
            .chars()
            .all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// Protect fenced code blocks, fence lines included. An unterminated fence
/// at end-of-document stays literal text rather than being dropped.
fn mask_fenced_code_blocks(text: &str, doc: &mut MaskedDocument) {
    let mut plain = String::new();
    let mut fence: Option<(char, usize, String)> = None;

    for line in text.split_inclusive('\n') {
        match &mut fence {
            None => {
                if let Some((fence_char, fence_len)) = fence_open(line) {
                    fence = Some((fence_char, fence_len, line.to_owned()));
                } else {
                    plain.push_str(line);
                }
            }
            Some((fence_char, fence_len, buffer)) => {
                buffer.push_str(line);
                if fence_close(line, *fence_char, *fence_len) {
                    doc.push_text(std::mem::take(&mut plain));
                    doc.push_protected(std::mem::take(buffer));
                    fence = None;
                }
            }
        }
    }

    if let Some((_, _, buffer)) = fence {
        plain.push_str(&buffer);
    }
    doc.push_text(plain);
}

/// Protect inline code spans: a run of backticks closes on the next run of
/// the same length. An unmatched run stays literal.
fn mask_inline_code_spans(doc: &mut MaskedDocument) {
    doc.resegment(|text, protected, out| {
        let bytes = text.as_bytes();
        let mut plain_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'`' {
                i += 1;
                continue;
            }
            let mut j = i;
            while j < bytes.len() && bytes[j] == b'`' {
                j += 1;
            }
            let delimiter = "`".repeat(j - i);
            match text[j..].find(&delimiter) {
                Some(rel) => {
                    let end = j + rel + delimiter.len();
                    if plain_start < i {
                        out.push(Segment::Text(text[plain_start..i].to_owned()));
                    }
                    protected.push(text[i..end].to_owned());
                    out.push(Segment::Protected(protected.len() - 1));
                    plain_start = end;
                    i = end;
                }
                // No closing run of this length: treat this backtick as
                // literal and rescan the rest of the run.
                None => i += 1,
            }
        }

        if plain_start < bytes.len() {
            out.push(Segment::Text(text[plain_start..].to_owned()));
        }
    });
}

// ============================================================================
// Math Regions
// ============================================================================

/// Whether the byte at `index` is directly preceded by a backslash.
fn preceded_by_backslash(bytes: &[u8], index: usize) -> bool {
    index > 0 && bytes[index - 1] == b'\\'
}

/// Find the next non-greedy `open…close` region at or after `from`.
///
/// Returns (region start, inner start, inner end, region end). With
/// `check_escape` the character before either delimiter must not be a
/// backslash.
fn find_region(
    text: &str,
    from: usize,
    open: &str,
    close: &str,
    check_escape: bool,
) -> Option<(usize, usize, usize, usize)> {
    let bytes = text.as_bytes();
    let mut search = from;

    while let Some(rel) = text.get(search..)?.find(open) {
        let start = search + rel;
        if check_escape && preceded_by_backslash(bytes, start) {
            search = start + 1;
            continue;
        }

        // Inner text must be non-empty, so the closer starts at least one
        // character after the opener ends. Measured in chars: the first
        // inner character may be multibyte.
        let inner_start = start + open.len();
        let first_char_len = text[inner_start..].chars().next().map_or(1, char::len_utf8);
        let mut close_search = inner_start + first_char_len;
        let mut found = None;
        while let Some(rel) = text.get(close_search..).and_then(|t| t.find(close)) {
            let at = close_search + rel;
            if check_escape && preceded_by_backslash(bytes, at) {
                close_search = at + 1;
                continue;
            }
            found = Some(at);
            break;
        }

        match found {
            Some(at) => return Some((start, inner_start, at, at + close.len())),
            None => search = start + 1,
        }
    }
    None
}

/// Protect every `open…close` math region in the remaining text, with the
/// inner text normalized.
fn mask_math_pass(
    doc: &mut MaskedDocument,
    open: &'static str,
    close: &'static str,
    check_escape: bool,
    mode: MathMode,
) {
    doc.resegment(|text, protected, out| {
        let mut pos = 0;
        while let Some((start, inner_start, inner_end, end)) =
            find_region(text, pos, open, close, check_escape)
        {
            if pos < start {
                out.push(Segment::Text(text[pos..start].to_owned()));
            }
            let inner = normalize_underscores(&text[inner_start..inner_end], mode);
            protected.push(format!("{open}{inner}{close}"));
            out.push(Segment::Protected(protected.len() - 1));
            pos = end;
        }
        if pos < text.len() {
            out.push(Segment::Text(text[pos..].to_owned()));
        }
    });
}

/// Normalize single-dollar inline math in place.
///
/// This is the last pass over the text, so the rewritten regions need no
/// protection. The opener must be unescaped and not part of `$$`; the
/// region must close on the same line.
fn rewrite_inline_dollar_math(doc: &mut MaskedDocument, mode: MathMode) {
    for segment in &mut doc.segments {
        if let Segment::Text(text) = segment {
            *text = rewrite_inline_dollar(text, mode);
        }
    }
}

fn rewrite_inline_dollar(text: &str, mode: MathMode) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut i = 0;

    while i < bytes.len() {
        let is_opener = bytes[i] == b'$'
            && !preceded_by_backslash(bytes, i)
            && bytes.get(i + 1) != Some(&b'$')
            && bytes.get(i + 1) != Some(&b'\n');
        if !is_opener {
            i += 1;
            continue;
        }

        // Closing `$` on the same line, unescaped, with non-empty inner.
        let mut j = i + 2;
        let mut close = None;
        while j < bytes.len() && bytes[j] != b'\n' {
            if bytes[j] == b'$' && !preceded_by_backslash(bytes, j) {
                close = Some(j);
                break;
            }
            j += 1;
        }

        match close {
            Some(j) => {
                out.push_str(&text[pos..i]);
                out.push('$');
                out.push_str(&normalize_underscores(&text[i + 1..j], mode));
                out.push('$');
                pos = j + 1;
                i = j + 1;
            }
            None => i += 1,
        }
    }

    out.push_str(&text[pos..]);
    out
}

// ============================================================================
// Underscore Escaping
// ============================================================================

/// Whether the char at `index` sits behind an odd run of backslashes.
fn odd_backslash_run(chars: &[char], index: usize) -> bool {
    let run = chars[..index].iter().rev().take_while(|&&c| c == '\\').count();
    run % 2 == 1
}

/// Apply the configured underscore rewrite to math inner text.
fn normalize_underscores(text: &str, mode: MathMode) -> String {
    match mode {
        MathMode::Keep => text.to_owned(),
        MathMode::Escaped => escape_underscores(text),
        MathMode::Underscore => unescape_underscores(text),
    }
}

/// `_` → `\_` for every underscore not already escaped.
fn escape_underscores(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (index, &c) in chars.iter().enumerate() {
        if c == '_' && !odd_backslash_run(&chars, index) {
            out.push_str("\\_");
        } else {
            out.push(c);
        }
    }
    out
}

/// `\_` → `_` for every escaping backslash that is itself unescaped.
fn unescape_underscores(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\'
            && chars.get(i + 1) == Some(&'_')
            && !odd_backslash_run(&chars, i)
        {
            out.push('_');
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
