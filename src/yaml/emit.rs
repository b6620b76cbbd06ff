//! Post-processing of emitted YAML text.
//!
//! `serde_yaml` resolves plain scalars with the YAML 1.2 core schema, where
//! `yes` or `off` are ordinary strings and are written without quotes. A
//! YAML 1.1 reader loads those back as booleans, so after emission each
//! plain key or value spelled that way is single-quoted. Real booleans are
//! always emitted as `true`/`false` and are left alone.

use std::borrow::Cow;

/// Plain scalars a YAML 1.1 reader resolves to a boolean.
const YAML11_BOOLEANS: &[&str] = &[
    "y", "Y", "yes", "Yes", "YES", "n", "N", "no", "No", "NO", "on", "On", "ON", "off", "Off",
    "OFF",
];

/// Single-quote every plain scalar in `text` that is a YAML 1.1 boolean word.
///
/// Expects block-style output with unwrapped lines. Bodies of literal and
/// folded block scalars are copied unchanged.
pub(super) fn quote_keywords(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Indentation of the line that opened the current block scalar.
    let mut block_parent: Option<usize> = None;

    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches('\n');
        let indent = body.len() - body.trim_start_matches(' ').len();

        if let Some(parent) = block_parent {
            if body.trim().is_empty() || indent > parent {
                out.push_str(line);
                continue;
            }
            block_parent = None;
        }

        let (rewritten, opens_block) = quote_line(body);
        if opens_block {
            block_parent = Some(indent);
        }
        out.push_str(&rewritten);
        out.push_str(&line[body.len()..]);
    }

    out
}

/// Rewrite one line, and report whether it opens a block scalar.
fn quote_line(body: &str) -> (String, bool) {
    let mut start = body.len() - body.trim_start_matches(' ').len();
    while body[start..].starts_with("- ") {
        start += 2;
    }
    let (prefix, rest) = body.split_at(start);

    let mut out = String::with_capacity(body.len() + 2);
    out.push_str(prefix);

    match split_entry(rest) {
        Some((key, value)) => {
            out.push_str(&quote(key));
            out.push(':');
            if !value.is_empty() {
                out.push(' ');
                out.push_str(&quote(value));
            }
            (out, is_block_header(value))
        }
        None => {
            out.push_str(&quote(rest));
            (out, is_block_header(rest))
        }
    }
}

/// Split `key: value` (or a bare `key:`) into its parts.
///
/// Returns `None` when the line holds a lone scalar.
fn split_entry(rest: &str) -> Option<(&str, &str)> {
    let key_end = match rest.chars().next()? {
        '\'' => closing_quote(rest, '\'')?,
        '"' => closing_quote(rest, '"')?,
        '?' if rest.len() == 1 || rest.starts_with("? ") => return None,
        _ => match rest.find(": ") {
            Some(pos) => pos,
            None if rest.ends_with(':') => rest.len() - 1,
            None => return None,
        },
    };

    let (key, after) = rest.split_at(key_end);
    if after == ":" {
        Some((key, ""))
    } else {
        after.strip_prefix(": ").map(|value| (key, value))
    }
}

/// Byte offset just past the quote closing the scalar opened at `text[0]`.
fn closing_quote(text: &str, quote: char) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
        } else if c == quote {
            // '' is an escaped quote inside a single-quoted scalar.
            if quote == '\'' && matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
            } else {
                return Some(i + c.len_utf8());
            }
        }
    }
    None
}

fn quote(scalar: &str) -> Cow<'_, str> {
    if YAML11_BOOLEANS.contains(&scalar) {
        Cow::Owned(format!("'{}'", scalar))
    } else {
        Cow::Borrowed(scalar)
    }
}

fn is_block_header(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some('|') | Some('>'))
        && chars.all(|c| c.is_ascii_digit() || c == '+' || c == '-')
}
