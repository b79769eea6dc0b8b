//! Convert and edit configuration documents across formats. Point it at a
//! Caddyfile, get TOML back; feed it JSON, get a Caddyfile.
//!
//! Every format decodes into one canonical [`Tree`] and encodes from it, so
//! any pair of registered formats converts:
//!
//! ```ignore
//! let registry = Registry::with_defaults(RenderOptions::default());
//! let toml = registry.convert("caddy", "toml", caddyfile.as_bytes())?;
//! ```
//!
//! # The tree
//!
//! A [`Tree`] is an ordered map whose leaves come in a closed set of shapes
//! ([`Value`]): `Empty` for bare presence, `Scalar`, `List`, `Nested` (one
//! list per write of a repeated directive) and `Table`. Codecs never guess
//! what shape a map produced; the tree decides when it is built.
//!
//! # The directive language
//!
//! The interesting codec is `caddy`, a line-oriented, brace-delimited
//! language:
//!
//! ```text
//! https://0.0.0.0:443 {
//!     log /var/log/site.log
//!     proxy / localhost:8080 {
//!         header_upstream -Proxy ""
//!         transparent
//!     }
//! }
//! ```
//!
//! Decoding runs four stages, each in its own module under [`directive`]:
//!
//! 1. **Tokenize**: whitespace-delimited tokens with line and column,
//!    comments stripped, quotes unwrapped, cut into top-level blocks.
//! 2. **Group**: each directive's tokens become occurrences with a main
//!    line and param lines. A param line is exactly one source line.
//! 3. **Project**: occurrences become tree paths:
//!    `[header, directive, "args"]` for the directive's own arguments and
//!    `[header, directive, param]` for each param. A path written once
//!    holds a `List`; written several times, a `Nested`.
//! 4. **Render** (encoding): the inverse. `Nested` values are spread back
//!    over as many occurrences as the directive had, and blocks with
//!    identical bodies are merged under one header line.
//!
//! Decoding the rendered text gives back the tree that was rendered. The
//! text itself is normalized: comments are dropped, indentation is fixed,
//! and an empty `{ }` body reads the same as no body.
//!
//! # Header keys
//!
//! Header keys like `https://0.0.0.0:443` collide with path syntax, so they
//! are stored quoted. [`KeyStyle::Quote`] (default) wraps them in `"`;
//! [`KeyStyle::Percent`] escapes the dots as `%2E`. One document always uses
//! one style.
//!
//! # Edit commands
//!
//! The `confed` binary reads a script of commands from stdin and applies
//! them to the decoded tree before writing it out:
//!
//! | Command          | Effect                                       |
//! |------------------|----------------------------------------------|
//! | `print`          | write the document at the end                |
//! | `dump`           | list every leaf as `path: value`, then stop  |
//! | `get PATH`       | write the subtree at PATH                    |
//! | `set PATH VALUE` | set a value (and write the document)         |
//! | `rm PATH`        | delete a value (and write the document)      |
//!
//! See [`run_script`] and [`run_session`].
//!
//! # Settings
//!
//! The binary's defaults come from a [`Settings`] struct (confique):
//! compiled defaults, then `confed.toml` in the platform config directory and
//! in the working directory, then `CONFED_*` environment variables, then
//! command-line flags. Unknown keys in a settings file are an error that
//! names the file and line.
//!
//! # Error handling
//!
//! All fallible operations return [`ConfedError`]. Parse errors carry the
//! offending token with its line and column; tree errors carry the path.

pub mod directive;
pub mod error;
pub mod keys;
pub mod types;

#[cfg(feature = "clap")]
mod cli;
mod codec;
mod ops;
mod settings;
mod tree;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::CliArgs;
pub use codec::{
    CaddyCodec, Codec, HclCodec, IniCodec, JsonCodec, PropertiesCodec, Registry, RegistryBuilder,
    TomlCodec, YamlCodec,
};
pub use directive::RenderOptions;
pub use error::ConfedError;
pub use ops::{
    CommandResult, ScriptOutcome, SessionOutput, execute, parse_command, run_script, run_session,
};
pub use settings::{Settings, SettingsInput, load as load_settings, resolve as resolve_settings, template};
pub use tree::{Tree, Value};
pub use types::{EditCommand, InputSource, Invocation, KeyStyle};
