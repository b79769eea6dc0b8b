//! Key quoting and path splitting.
//!
//! Tree paths are sequences of segments. When a path is spelled as a single
//! string (the command shell, listings) the segments are joined with a
//! delimiter, so raw keys carrying the delimiter or other reserved characters
//! must be quoted before they become segments. Header keys of the directive
//! language (`https://0.0.0.0:443`) are the usual case.
//!
//! Two conventions exist, selected by [`KeyStyle`]:
//!
//! | Style     | `0.0.0.0:80`       |
//! |-----------|--------------------|
//! | `Quote`   | `"0.0.0.0:80"`     |
//! | `Percent` | `0%2E0%2E0%2E0:80` |
//!
//! For every string `s` and either style, `unquote(quote(s)) == s`.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::types::KeyStyle;

/// Characters that force quote-style wrapping.
const RESERVED: [char; 4] = ['.', ':', '/', '"'];

/// Bytes escaped by the percent style. `%` itself must be escaped so that a
/// literal `%2E` in a key survives decoding.
const PERCENT_SET: &AsciiSet = &CONTROLS.add(b'.').add(b'%');

impl KeyStyle {
    /// Turn a raw key into a tree segment.
    pub fn quote(self, key: &str) -> String {
        match self {
            KeyStyle::Quote => quote_key(key),
            KeyStyle::Percent => utf8_percent_encode(key, PERCENT_SET).to_string(),
        }
    }

    /// Recover the raw key from a tree segment.
    pub fn unquote(self, segment: &str) -> String {
        match self {
            KeyStyle::Quote => unquote_key(segment),
            KeyStyle::Percent => percent_decode_str(segment).decode_utf8_lossy().into_owned(),
        }
    }
}

/// Quote-style wrapping: returns `key` unchanged unless it contains a
/// reserved character.
pub fn quote_key(key: &str) -> String {
    if !key.contains(RESERVED) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 2);
    out.push('"');
    for c in key.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Inverse of [`quote_key`]. Segments not wrapped in `"..."` come back as-is.
pub fn unquote_key(segment: &str) -> String {
    let Some(inner) = segment
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return segment.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Split a delimited path into segments.
///
/// Delimiters inside a `"..."` segment do not split, and the quotes are kept
/// so the segments match what the tree stores.
pub fn split_path(path: &str, delim: &str) -> Vec<String> {
    if path.is_empty() {
        return vec![];
    }
    if delim.is_empty() {
        return vec![path.to_string()];
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut rest = path;

    while let Some(c) = rest.chars().next() {
        if !in_quotes && rest.starts_with(delim) {
            segments.push(std::mem::take(&mut current));
            rest = &rest[delim.len()..];
            continue;
        }
        rest = &rest[c.len_utf8()..];
        current.push(c);
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(next) = rest.chars().next() {
                    current.push(next);
                    rest = &rest[next.len_utf8()..];
                }
            }
            _ => {}
        }
    }
    segments.push(current);
    segments
}

/// Join segments into a delimited path.
pub fn join_path<S: AsRef<str>>(segments: &[S], delim: &str) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(delim)
}
