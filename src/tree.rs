//! The canonical configuration tree every format decodes into and encodes from.
//!
//! A [`Tree`] is an ordered map from segment to [`Value`]. Leaves come in a
//! closed set of shapes so codecs never have to guess what a map produced:
//!
//! | Variant  | Meaning                                        | JSON view        |
//! |----------|------------------------------------------------|------------------|
//! | `Empty`  | bare presence (a flag directive, a null)       | `""`             |
//! | `Scalar` | one string                                     | `"x"`            |
//! | `List`   | one sequence of strings                        | `["a", "b"]`     |
//! | `Nested` | one sequence per write of a repeated directive | `[["a"], ["b"]]` |
//! | `Table`  | a subtree                                      | `{...}`          |
//!
//! The serde impls bridge the tree to any self-describing format. Numbers and
//! booleans are read as their text, since the directive language has no other
//! types.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ConfedError;

/// Key under which `toml` hands datetimes to a deserializer.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    entries: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Scalar(String),
    List(Vec<String>),
    Nested(Vec<Vec<String>>),
    Table(Tree),
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Children in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or replace a direct child, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Look up a value by path segments. An empty path never matches.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (leaf, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            match current.entries.get(segment.as_ref())? {
                Value::Table(sub) => current = sub,
                _ => return None,
            }
        }
        current.entries.get(leaf.as_ref())
    }

    /// Write `value` at `path`, creating intermediate tables.
    ///
    /// Fails with [`ConfedError::SchemaConflict`] when an intermediate segment
    /// holds a leaf, or when a leaf would replace an existing table. Writes
    /// done before the failure are kept.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) -> Result<(), ConfedError> {
        let Some((leaf, parents)) = path.split_last() else {
            return Err(ConfedError::SchemaConflict {
                path: "<root>".into(),
            });
        };

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entries
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| Value::Table(Tree::new()));
            match entry {
                Value::Table(sub) => current = sub,
                _ => {
                    return Err(ConfedError::SchemaConflict {
                        path: dotted(&path[..=depth]),
                    });
                }
            }
        }

        let leaf = leaf.as_ref();
        if matches!(current.entries.get(leaf), Some(Value::Table(_)))
            && !matches!(value, Value::Table(_))
        {
            return Err(ConfedError::SchemaConflict { path: dotted(path) });
        }
        current.entries.insert(leaf.to_string(), value);
        Ok(())
    }

    /// Remove the value at `path`, returning it. Sibling order is preserved.
    pub fn delete_path<S: AsRef<str>>(&mut self, path: &[S]) -> Option<Value> {
        let (leaf, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            match current.entries.get_mut(segment.as_ref())? {
                Value::Table(sub) => current = sub,
                _ => return None,
            }
        }
        current.entries.shift_remove(leaf.as_ref())
    }

    /// Every non-table value with its path joined by `delim`, depth first in
    /// insertion order. Empty tables are listed too so nothing disappears
    /// from a listing.
    pub fn leaves(&self, delim: &str) -> Vec<(String, &Value)> {
        self.leaf_paths()
            .into_iter()
            .map(|(path, value)| (path.join(delim), value))
            .collect()
    }

    /// Like [`leaves`](Self::leaves), with the path kept as segments.
    pub fn leaf_paths(&self) -> Vec<(Vec<&str>, &Value)> {
        let mut out = Vec::new();
        collect_leaves(self, &mut Vec::new(), &mut out);
        out
    }
}

fn collect_leaves<'a>(tree: &'a Tree, prefix: &mut Vec<&'a str>, out: &mut Vec<(Vec<&'a str>, &'a Value)>) {
    for (key, value) in &tree.entries {
        prefix.push(key.as_str());
        match value {
            Value::Table(sub) if !sub.is_empty() => collect_leaves(sub, prefix, out),
            _ => out.push((prefix.clone(), value)),
        }
        prefix.pop();
    }
}

fn dotted<S: AsRef<str>>(path: &[S]) -> String {
    crate::keys::join_path(path, ".")
}

impl<K: Into<String>> FromIterator<(K, Value)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Tree {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Value {
    pub fn as_table(&self) -> Option<&Tree> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The leaf as an argument list: `Empty` is no arguments, a `Scalar` is
    /// one. `Nested` and `Table` have no single list.
    pub fn as_args(&self) -> Option<Vec<String>> {
        match self {
            Value::Empty => Some(vec![]),
            Value::Scalar(s) => Some(vec![s.clone()]),
            Value::List(items) => Some(items.clone()),
            Value::Nested(_) | Value::Table(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        Value::Table(tree)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Scalar(s) => write!(f, "{s}"),
            Value::List(_) | Value::Nested(_) | Value::Table(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
        }
    }
}

// --- Serialize ---

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_str(""),
            Value::Scalar(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Nested(groups) => serializer.collect_seq(groups),
            Value::Table(tree) => tree.serialize(serializer),
        }
    }
}

// --- Deserialize ---

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Table(tree) => Ok(tree),
            Value::Empty => Ok(Tree::new()),
            _ => Err(de::Error::custom("document root must be a table")),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, sequence or table")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(scalar(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Empty)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Empty)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(classify_seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut tree = Tree::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<Value>()?;
            if key == TOML_DATETIME_KEY && tree.is_empty() {
                return Ok(value);
            }
            tree.entries.insert(key, value);
        }
        Ok(Value::Table(tree))
    }
}

/// A decoded string leaf; the empty string is bare presence.
pub(crate) fn scalar(s: String) -> Value {
    if s.is_empty() {
        Value::Empty
    } else {
        Value::Scalar(s)
    }
}

/// Pick the closed shape for a decoded sequence: strings become a `List`,
/// sequences of lists a `Nested`, anything else a table keyed by index.
fn classify_seq(items: Vec<Value>) -> Value {
    if items
        .iter()
        .all(|v| matches!(v, Value::Scalar(_) | Value::Empty))
    {
        return Value::List(
            items
                .into_iter()
                .map(|v| match v {
                    Value::Scalar(s) => s,
                    _ => String::new(),
                })
                .collect(),
        );
    }
    if items.iter().all(|v| matches!(v, Value::List(_))) {
        return Value::Nested(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::List(inner) => Some(inner),
                    _ => None,
                })
                .collect(),
        );
    }
    Value::Table(
        items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
    )
}
