use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How raw keys that collide with path syntax are stored as tree segments.
///
/// A document is always written with exactly one style; the two are never
/// mixed because a percent-encoded key is a valid quote-style key and vice
/// versa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum KeyStyle {
    /// Wrap the key in `"` and backslash-escape embedded quotes:
    /// `https://0.0.0.0:443` → `"https://0.0.0.0:443"`.
    #[default]
    Quote,
    /// Percent-encode the path delimiter: `0.0.0.0` → `0%2E0%2E0%2E0`.
    Percent,
}

/// A line-editing command, independent of where the script comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Mark the document for printing once the script ends.
    Print,
    /// List every leaf as `path: value` and stop.
    Dump,
    Get { path: String },
    Set { path: String, value: String },
    /// `rm` and `del` are synonyms.
    Remove { path: String },
}

/// Where the document to convert comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

/// One run of the tool, independent of how the arguments were parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub input: InputSource,
    /// Read an edit script from stdin. Never set when the document itself
    /// comes from stdin.
    pub run_commands: bool,
    /// Print the settings template and exit.
    pub print_settings: bool,
    pub verbose: bool,
}
