//! Tree-to-directive reconstruction.
//!
//! The inverse of projection. A `Nested` value under `args` means the
//! directive occurred that many times, so it is rendered that many times;
//! other `Nested` values are spread over those occurrences in order. Decoding
//! the output gives back the tree that was rendered.

use indexmap::IndexMap;

use crate::error::ConfedError;
use crate::keys::join_path;
use crate::tree::{Tree, Value};
use crate::types::KeyStyle;

use super::projector::ARGS_KEY;

/// Knobs for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// How root segments were quoted when the tree was built.
    pub key_style: KeyStyle,
    /// Merge blocks with byte-identical bodies under one header line.
    pub compact: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            key_style: KeyStyle::default(),
            compact: true,
        }
    }
}

/// One occurrence of a directive, ready to print.
#[derive(Debug, Default)]
struct Occurrence {
    args: Vec<String>,
    params: Vec<(String, Vec<String>)>,
}

/// Render a tree as a directive document.
pub fn render(tree: &Tree, options: RenderOptions) -> Result<String, ConfedError> {
    let mut blocks = Vec::with_capacity(tree.len());
    for (segment, value) in tree.iter() {
        let Value::Table(directives) = value else {
            return Err(unrenderable(&[segment], "expected a table of directives"));
        };
        let mut body = String::new();
        for (name, value) in directives.iter() {
            render_directive(&mut body, segment, name, value)?;
        }
        blocks.push((options.key_style.unquote(segment), body));
    }

    let blocks = if options.compact {
        compact(blocks)
    } else {
        blocks
            .into_iter()
            .map(|(key, body)| (vec![key], body))
            .collect()
    };

    let mut out = String::new();
    for (i, (keys, body)) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let header: Vec<String> = keys.iter().map(|k| quote_arg(k)).collect();
        out.push_str(&header.join(" "));
        out.push_str(" {\n");
        out.push_str(body);
        out.push_str("}\n");
    }
    Ok(out)
}

fn render_directive(out: &mut String, root: &str, name: &str, value: &Value) -> Result<(), ConfedError> {
    let table = match value {
        Value::Empty => {
            out.push('\t');
            out.push_str(&quote_arg(name));
            out.push('\n');
            return Ok(());
        }
        Value::Table(table) => table,
        _ => return Err(unrenderable(&[root, name], "a directive must be a table or empty")),
    };

    let slots = match table.get(ARGS_KEY) {
        Some(Value::Nested(all)) => all.len().max(1),
        _ => 1,
    };
    let mut occurrences: Vec<Occurrence> = (0..slots).map(|_| Occurrence::default()).collect();

    for (key, value) in table.iter() {
        match value {
            Value::Nested(all) if key == ARGS_KEY => {
                for (slot, args) in occurrences.iter_mut().zip(all) {
                    slot.args = args.clone();
                }
            }
            Value::Nested(all) => {
                for (i, args) in all.iter().enumerate() {
                    occurrences[i.min(slots - 1)]
                        .params
                        .push((key.to_string(), args.clone()));
                }
            }
            other => {
                let args = other
                    .as_args()
                    .ok_or_else(|| unrenderable(&[root, name, key], "nested tables cannot be rendered"))?;
                if key == ARGS_KEY {
                    occurrences[0].args = args;
                } else {
                    occurrences[0].params.push((key.to_string(), args));
                }
            }
        }
    }

    for occurrence in &occurrences {
        out.push('\t');
        out.push_str(&quote_arg(name));
        push_args(out, &occurrence.args);
        if occurrence.params.is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str(" {\n");
        for (key, args) in &occurrence.params {
            out.push_str("\t\t");
            out.push_str(&quote_arg(key));
            push_args(out, args);
            out.push('\n');
        }
        out.push_str("\t}\n");
    }
    Ok(())
}

fn push_args(out: &mut String, args: &[String]) {
    for arg in args {
        out.push(' ');
        out.push_str(&quote_arg(arg));
    }
}

/// Quote an argument the tokenizer would otherwise split, drop, read as a
/// brace or treat as a comment.
fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg == "{"
        || arg == "}"
        || arg.starts_with('"')
        || arg.starts_with('#')
        || arg.chars().any(char::is_whitespace);
    if !needs_quotes {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Merge blocks with identical bodies, keeping the first block's position.
fn compact(blocks: Vec<(String, String)>) -> Vec<(Vec<String>, String)> {
    let mut by_body: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, body) in blocks {
        by_body.entry(body).or_default().push(key);
    }
    by_body.into_iter().map(|(body, keys)| (keys, body)).collect()
}

fn unrenderable(path: &[&str], reason: &str) -> ConfedError {
    ConfedError::ReconstructionError {
        path: join_path(path, "."),
        reason: reason.to_string(),
    }
}
