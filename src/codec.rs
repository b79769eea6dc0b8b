//! Format codecs and the registry that dispatches between them.
//!
//! Every format reads into and writes from the same [`Tree`], so converting
//! is `decode` with one codec followed by `encode` with another.
//!
//! ```ignore
//! let registry = Registry::with_defaults(RenderOptions::default());
//! let tree = registry.get("caddy")?.decode(input)?;
//! let json = registry.get("json")?.encode(&tree)?;
//! ```
//!
//! The registry is built once and never changes afterwards; registering the
//! same name twice fails while building.

use std::fmt;

use encoding_rs::UTF_8;
use indexmap::IndexMap;
use ini::Ini;
use java_properties::{PropertiesIter, PropertiesWriter};
use tracing::debug;

use crate::directive::{self, RenderOptions};
use crate::error::ConfedError;
use crate::keys::{join_path, split_path};
use crate::tree::{Tree, Value, scalar};

/// Segment delimiter of flat formats: INI section names and property keys.
const FLAT_DELIM: &str = ".";

/// A format that can be read into a [`Tree`] and written back.
pub trait Codec: Send + Sync {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError>;
    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError>;
}

/// The block-directive language.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaddyCodec {
    options: RenderOptions,
}

impl CaddyCodec {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl Codec for CaddyCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        let text = std::str::from_utf8(input)?;
        directive::decode(text, self.options.key_style)
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        directive::encode(tree, self.options).map(String::into_bytes)
    }
}

/// Pretty-printed JSON with a trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        serde_json::from_slice(input).map_err(|e| ConfedError::decode("json", e))
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        let mut out = serde_json::to_vec_pretty(tree).map_err(|e| ConfedError::encode("json", e))?;
        out.push(b'\n');
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        let text = std::str::from_utf8(input)?;
        toml::from_str(text).map_err(|e| ConfedError::decode("toml", e))
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        toml::to_string(tree)
            .map(String::into_bytes)
            .map_err(|e| ConfedError::encode("toml", e))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        serde_yaml::from_slice(input).map_err(|e| ConfedError::decode("yaml", e))
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        serde_yaml::to_string(tree)
            .map(String::into_bytes)
            .map_err(|e| ConfedError::encode("yaml", e))
    }
}

/// HashiCorp configuration language. Blocks read as tables, each label one
/// more level.
#[derive(Debug, Clone, Copy, Default)]
pub struct HclCodec;

impl Codec for HclCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        let text = std::str::from_utf8(input)?;
        hcl::from_str(text).map_err(|e| ConfedError::decode("hcl", e))
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        hcl::to_string(tree)
            .map(String::into_bytes)
            .map_err(|e| ConfedError::encode("hcl", e))
    }
}

/// INI. A key's section is its parent path joined by `.`; keys outside any
/// section sit at the root. Values read back as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

impl Codec for IniCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        let text = std::str::from_utf8(input)?;
        let ini = Ini::load_from_str(text).map_err(|e| ConfedError::decode("ini", e))?;
        let mut tree = Tree::new();
        for (section, props) in ini.iter() {
            let mut path = section
                .map(|name| split_path(name, FLAT_DELIM))
                .unwrap_or_default();
            for (key, value) in props.iter() {
                path.push(key.to_string());
                tree.set_path(&path, scalar(value.to_string()))?;
                path.pop();
            }
        }
        Ok(tree)
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        let mut ini = Ini::new();
        for (path, value) in flat_leaves(tree) {
            let Some((key, parents)) = path.split_last() else {
                continue;
            };
            let section = (!parents.is_empty()).then(|| join_path(parents, FLAT_DELIM));
            ini.with_section(section).set(*key, value);
        }
        let mut out = Vec::new();
        ini.write_to(&mut out)
            .map_err(|e| ConfedError::encode("ini", e))?;
        Ok(out)
    }
}

/// Java properties, UTF-8. Keys are full paths joined by `.`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesCodec;

impl Codec for PropertiesCodec {
    fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
        let mut pairs = Vec::new();
        PropertiesIter::new_with_encoding(input, UTF_8)
            .read_into(|key, value| pairs.push((key, value)))
            .map_err(|e| ConfedError::decode("properties", e))?;
        let mut tree = Tree::new();
        for (key, value) in pairs {
            tree.set_path(&split_path(&key, FLAT_DELIM), scalar(value))?;
        }
        Ok(tree)
    }

    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        let mut out = Vec::new();
        {
            let mut writer = PropertiesWriter::new_with_encoding(&mut out, UTF_8);
            for (path, value) in flat_leaves(tree) {
                writer
                    .write(&join_path(&path, FLAT_DELIM), &value)
                    .map_err(|e| ConfedError::encode("properties", e))?;
            }
            writer
                .finish()
                .map_err(|e| ConfedError::encode("properties", e))?;
        }
        Ok(out)
    }
}

/// Leaves rendered as single strings for formats without lists. Lists keep
/// their JSON text; empty tables have nothing to write.
fn flat_leaves(tree: &Tree) -> Vec<(Vec<&str>, String)> {
    tree.leaf_paths()
        .into_iter()
        .filter(|(_, value)| !matches!(value, Value::Table(_)))
        .map(|(path, value)| (path, value.to_string()))
        .collect()
}

/// Codecs by format name.
pub struct Registry {
    codecs: IndexMap<String, Box<dyn Codec>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            codecs: IndexMap::new(),
        }
    }

    /// `caddy`, `hcl`, `ini`, `json`, `properties`, `toml` and `yaml`.
    /// `options` configures the caddy codec.
    pub fn with_defaults(options: RenderOptions) -> Self {
        let mut codecs: IndexMap<String, Box<dyn Codec>> = IndexMap::new();
        codecs.insert("caddy".into(), Box::new(CaddyCodec::new(options)));
        codecs.insert("hcl".into(), Box::new(HclCodec));
        codecs.insert("ini".into(), Box::new(IniCodec));
        codecs.insert("json".into(), Box::new(JsonCodec));
        codecs.insert("properties".into(), Box::new(PropertiesCodec));
        codecs.insert("toml".into(), Box::new(TomlCodec));
        codecs.insert("yaml".into(), Box::new(YamlCodec));
        Registry { codecs }
    }

    pub fn get(&self, name: &str) -> Result<&dyn Codec, ConfedError> {
        self.codecs
            .get(name)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| ConfedError::UnknownFormat(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Format names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    pub fn decode(&self, format: &str, input: &[u8]) -> Result<Tree, ConfedError> {
        debug!(format, bytes = input.len(), "decoding");
        self.get(format)?.decode(input)
    }

    pub fn encode(&self, format: &str, tree: &Tree) -> Result<Vec<u8>, ConfedError> {
        debug!(format, entries = tree.len(), "encoding");
        self.get(format)?.encode(tree)
    }

    /// Decode `input` as `from` and re-encode it as `to`.
    pub fn convert(&self, from: &str, to: &str, input: &[u8]) -> Result<Vec<u8>, ConfedError> {
        // Fail on an unknown output format before doing any work.
        self.get(to)?;
        let tree = self.decode(from, input)?;
        self.encode(to, &tree)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("formats", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects codecs for a [`Registry`].
pub struct RegistryBuilder {
    codecs: IndexMap<String, Box<dyn Codec>>,
}

impl RegistryBuilder {
    /// Add a codec under `name`. Fails if the name is taken.
    pub fn register<C: Codec + 'static>(mut self, name: &str, codec: C) -> Result<Self, ConfedError> {
        if self.codecs.contains_key(name) {
            return Err(ConfedError::DuplicateFormat(name.to_string()));
        }
        self.codecs.insert(name.to_string(), Box::new(codec));
        Ok(self)
    }

    /// Add the built-in codecs.
    pub fn with_defaults(self, options: RenderOptions) -> Result<Self, ConfedError> {
        self.register("caddy", CaddyCodec::new(options))?
            .register("hcl", HclCodec)?
            .register("ini", IniCodec)?
            .register("json", JsonCodec)?
            .register("properties", PropertiesCodec)?
            .register("toml", TomlCodec)?
            .register("yaml", YamlCodec)
    }

    pub fn build(self) -> Registry {
        Registry {
            codecs: self.codecs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::SITES;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> Registry {
        Registry::with_defaults(RenderOptions::default())
    }

    struct Upper;

    impl Codec for Upper {
        fn decode(&self, input: &[u8]) -> Result<Tree, ConfedError> {
            let text = String::from_utf8_lossy(input).to_uppercase();
            Ok([("text", Value::Scalar(text))].into_iter().collect())
        }

        fn encode(&self, _tree: &Tree) -> Result<Vec<u8>, ConfedError> {
            Ok(b"UPPER".to_vec())
        }
    }

    #[test]
    fn defaults_are_registered() {
        let binding = registry();
        let names: Vec<&str> = binding.names().collect();
        assert_eq!(
            names,
            vec!["caddy", "hcl", "ini", "json", "properties", "toml", "yaml"]
        );
    }

    #[test]
    fn unknown_format() {
        let err = registry().get("xml").err().unwrap();
        assert!(matches!(err, ConfedError::UnknownFormat(ref name) if name == "xml"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let err = Registry::builder()
            .register("up", Upper)
            .unwrap()
            .register("up", Upper)
            .err()
            .unwrap();
        assert!(matches!(err, ConfedError::DuplicateFormat(ref name) if name == "up"));
    }

    #[test]
    fn builder_with_defaults_rejects_builtin_names() {
        let err = Registry::builder()
            .register("json", Upper)
            .unwrap()
            .with_defaults(RenderOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ConfedError::DuplicateFormat(ref name) if name == "json"));
    }

    #[test]
    fn custom_codec_dispatch() {
        let registry = Registry::builder()
            .with_defaults(RenderOptions::default())
            .unwrap()
            .register("upper", Upper)
            .unwrap()
            .build();
        let out = registry.convert("upper", "json", b"abc").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"text\": \"ABC\"\n}\n");
        assert!(registry.contains("upper"));
    }

    #[test]
    fn json_shapes() {
        let tree = JsonCodec
            .decode(br#"{"a": {"list": ["x", "y"], "nested": [["x"], []], "flag": "", "n": 3}}"#)
            .unwrap();
        assert_eq!(tree.get_path(&["a", "list"]), Some(&Value::List(strings(&["x", "y"]))));
        assert_eq!(
            tree.get_path(&["a", "nested"]),
            Some(&Value::Nested(vec![strings(&["x"]), vec![]]))
        );
        assert_eq!(tree.get_path(&["a", "flag"]), Some(&Value::Empty));
        assert_eq!(tree.get_path(&["a", "n"]), Some(&Value::from("3")));
    }

    #[test]
    fn json_root_must_be_table() {
        let err = JsonCodec.decode(b"[1, 2]").unwrap_err();
        assert!(matches!(err, ConfedError::Decode { ref format, .. } if format == "json"));
    }

    #[test]
    fn caddy_through_every_format() {
        let registry = registry();
        let tree = registry.decode("caddy", SITES.as_bytes()).unwrap();
        for format in ["json", "toml", "yaml"] {
            let bytes = registry.encode(format, &tree).unwrap();
            let back = registry.decode(format, &bytes).unwrap();
            assert_eq!(back, tree, "{format} lost information");
        }
    }

    #[test]
    fn toml_to_caddy() {
        let input = r#"
["example.com:80".log]
args = ["/var/log/a.log"]

["example.com:80".proxy]
args = ["/", "localhost:8080"]
transparent = ""
"#;
        let out = registry().convert("toml", "caddy", input.as_bytes()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "example.com:80 {\n\tlog /var/log/a.log\n\tproxy / localhost:8080 {\n\t\ttransparent\n\t}\n}\n"
        );
    }

    #[test]
    fn yaml_input() {
        let input = "site:\n  gzip: ''\n  log:\n    args: [a.log]\n";
        let tree = YamlCodec.decode(input.as_bytes()).unwrap();
        assert_eq!(tree.get_path(&["site", "gzip"]), Some(&Value::Empty));
        assert_eq!(
            tree.get_path(&["site", "log", "args"]),
            Some(&Value::List(strings(&["a.log"])))
        );
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let err = CaddyCodec::default().decode(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ConfedError::InvalidUtf8(_)));
    }

    #[test]
    fn convert_checks_output_format_first() {
        let err = registry().convert("caddy", "xml", b"}").unwrap_err();
        assert!(matches!(err, ConfedError::UnknownFormat(ref name) if name == "xml"));
    }

    fn site_tree() -> Tree {
        let mut tree = Tree::new();
        tree.set_path(&["site", "log", "args"], Value::from("a.log")).unwrap();
        tree.set_path(&["site", "gzip"], Value::Empty).unwrap();
        tree.set_path(&["top"], Value::from("1")).unwrap();
        tree
    }

    #[test]
    fn ini_sections_are_paths() {
        let input = "top = 1\n\n[site]\ngzip =\n\n[site.log]\nargs = a.log\n";
        let tree = IniCodec.decode(input.as_bytes()).unwrap();
        assert_eq!(tree.get_path(&["top"]), Some(&Value::from("1")));
        assert_eq!(tree.get_path(&["site", "gzip"]), Some(&Value::Empty));
        assert_eq!(tree.get_path(&["site", "log", "args"]), Some(&Value::from("a.log")));
    }

    #[test]
    fn ini_round_trip() {
        let tree = site_tree();
        let bytes = IniCodec.encode(&tree).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("[site.log]"), "{text}");
        let back = IniCodec.decode(text.as_bytes()).unwrap();
        assert_eq!(back.get_path(&["top"]), tree.get_path(&["top"]));
        assert_eq!(back.get_path(&["site", "gzip"]), Some(&Value::Empty));
        assert_eq!(back.get_path(&["site", "log", "args"]), Some(&Value::from("a.log")));
    }

    #[test]
    fn ini_writes_lists_as_json() {
        let mut tree = Tree::new();
        tree.set_path(&["site", "proxy", "args"], Value::List(strings(&["/", "x"])))
            .unwrap();
        let text = String::from_utf8(IniCodec.encode(&tree).unwrap()).unwrap();
        let back = IniCodec.decode(text.as_bytes()).unwrap();
        assert_eq!(
            back.get_path(&["site", "proxy", "args"]),
            Some(&Value::from(r#"["/","x"]"#))
        );
    }

    #[test]
    fn properties_keys_are_paths() {
        let input = "# comment\nsite.log.args = a.log\nsite.gzip=\ntop: 1\n";
        let tree = PropertiesCodec.decode(input.as_bytes()).unwrap();
        assert_eq!(tree.get_path(&["site", "log", "args"]), Some(&Value::from("a.log")));
        assert_eq!(tree.get_path(&["site", "gzip"]), Some(&Value::Empty));
        assert_eq!(tree.get_path(&["top"]), Some(&Value::from("1")));
    }

    #[test]
    fn properties_round_trip_with_quoted_header() {
        let mut tree = site_tree();
        tree.set_path(&["\"localhost:2015\"", "gzip"], Value::Empty).unwrap();
        let bytes = PropertiesCodec.encode(&tree).unwrap();
        assert_eq!(PropertiesCodec.decode(&bytes).unwrap(), tree);
    }

    #[test]
    fn properties_conflict_is_reported() {
        let err = PropertiesCodec.decode(b"a = 1\na.b = 2\n").unwrap_err();
        assert!(matches!(err, ConfedError::SchemaConflict { .. }));
    }

    #[test]
    fn hcl_blocks_become_tables() {
        let input = r#"
top = 1
site "example" {
  gzip = ""
  log {
    args = ["a.log"]
  }
}
"#;
        let tree = HclCodec.decode(input.as_bytes()).unwrap();
        assert_eq!(tree.get_path(&["top"]), Some(&Value::from("1")));
        assert_eq!(tree.get_path(&["site", "example", "gzip"]), Some(&Value::Empty));
        assert_eq!(
            tree.get_path(&["site", "example", "log", "args"]),
            Some(&Value::List(strings(&["a.log"])))
        );
    }

    #[test]
    fn hcl_round_trip() {
        let mut tree = site_tree();
        tree.set_path(
            &["site", "proxy", "args"],
            Value::Nested(vec![strings(&["/a", "x"]), strings(&["/b", "y"])]),
        )
        .unwrap();
        let bytes = HclCodec.encode(&tree).unwrap();
        assert_eq!(HclCodec.decode(&bytes).unwrap(), tree);
    }

    #[test]
    fn hcl_syntax_error() {
        let err = HclCodec.decode(b"site {").unwrap_err();
        assert!(matches!(err, ConfedError::Decode { ref format, .. } if format == "hcl"));
    }
}
