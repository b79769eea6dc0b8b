//! The block-directive language (Caddyfile-style).
//!
//! ```text
//! bytes ─ tokenize ─▶ [Block] ─ group ─▶ {name → [Directive]} ─ project ─▶ Tree
//! Tree ─ render ─▶ text
//! ```
//!
//! Decoding then re-encoding is not byte-identical (comments, indentation and
//! directive order are normalized) but decoding the output again yields the
//! same tree. An empty `{ }` body is read as if the directive had no body.

pub mod grouper;
pub mod projector;
pub mod render;
pub mod tokenizer;

use indexmap::IndexMap;

use crate::error::ConfedError;
use crate::tree::Tree;
use crate::types::KeyStyle;

pub use grouper::{Directive, Line, group};
pub use projector::project;
pub use render::{RenderOptions, render};
pub use tokenizer::{Block, Token, tokenize};

/// Parse a whole document into a tree.
pub fn decode(input: &str, style: KeyStyle) -> Result<Tree, ConfedError> {
    let mut tree = Tree::new();
    for block in tokenize(input)? {
        let mut grouped = IndexMap::with_capacity(block.tokens.len());
        for (name, tokens) in &block.tokens {
            grouped.insert(name.clone(), group(tokens, name)?);
        }
        project(&block, &grouped, &mut tree, style)?;
    }
    Ok(tree)
}

/// Render a tree back into a document.
pub fn encode(tree: &Tree, options: RenderOptions) -> Result<String, ConfedError> {
    render(tree, options)
}
