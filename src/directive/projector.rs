//! Directive-to-tree projection.
//!
//! Every header key of a block becomes a root segment, every directive name a
//! table under it:
//!
//! ```text
//! example.com:80 {              "example.com:80"
//!     proxy /a x {                  proxy
//!         without /a                    args:    [["/a", "x"], ["/b", "y"]]
//!     }                                 without: ["/a"]
//!     proxy /b y                    gzip: ""
//!     gzip
//! }
//! ```
//!
//! A path written once holds the written list; a path written by several
//! occurrences (or repeated param lines) holds one list per write. The
//! renderer reads that nesting back to recover occurrence boundaries.

use indexmap::IndexMap;

use crate::error::ConfedError;
use crate::tree::{Tree, Value};
use crate::types::KeyStyle;

use super::grouper::Directive;
use super::tokenizer::Block;

/// Table key holding a directive's own arguments.
pub const ARGS_KEY: &str = "args";

/// Write the directives of one block into `tree`, once per header key.
pub fn project(
    block: &Block,
    grouped: &IndexMap<String, Vec<Directive>>,
    tree: &mut Tree,
    style: KeyStyle,
) -> Result<(), ConfedError> {
    for key in &block.keys {
        let root = style.quote(key);
        for (name, directives) in grouped {
            let writes = collect_writes(directives);
            if writes.is_empty() {
                tree.set_path(&[root.as_str(), name.as_str()], Value::Empty)?;
                continue;
            }
            for (field, values) in writes {
                tree.set_path(&[root.as_str(), name.as_str(), field.as_str()], collapse(values))?;
            }
        }
    }
    Ok(())
}

/// Every write of every occurrence, grouped by target field in first-write
/// order. An empty `{ }` body contributes nothing.
fn collect_writes(directives: &[Directive]) -> IndexMap<String, Vec<Vec<String>>> {
    let mut writes: IndexMap<String, Vec<Vec<String>>> = IndexMap::new();
    for dir in directives {
        if !dir.main.args.is_empty() {
            writes
                .entry(ARGS_KEY.to_string())
                .or_default()
                .push(dir.main.args.clone());
        }
        for param in &dir.params {
            writes
                .entry(param.name.clone())
                .or_default()
                .push(param.args.clone());
        }
    }
    writes
}

fn collapse(values: Vec<Vec<String>>) -> Value {
    match <[Vec<String>; 1]>::try_from(values) {
        Ok([single]) if single.is_empty() => Value::Empty,
        Ok([single]) => Value::List(single),
        Err(many) => Value::Nested(many),
    }
}
