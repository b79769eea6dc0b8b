//! Clap adapter for the `confed` binary.
//!
//! Compiled only with the `clap` Cargo feature (on by default). The parsed
//! [`CliArgs`] turn into two clap-free values: settings overrides for
//! [`settings::load`](crate::settings::load), and an
//! [`Invocation`](crate::types::Invocation) describing what to do.

use std::path::PathBuf;

use clap::Parser;
use toml::Value;

use crate::types::{InputSource, Invocation, KeyStyle};

/// Convert and edit configuration documents.
///
/// Reads FILE (or stdin) in the input format, applies edit commands read from
/// stdin, and writes the result in the output format. Commands, one per line:
/// `print`, `dump`, `get PATH`, `set PATH VALUE`, `rm PATH`.
#[derive(Debug, Parser)]
#[command(name = "confed", version)]
pub struct CliArgs {
    /// Input format (caddy, hcl, ini, json, properties, toml, yaml) [default: json]
    #[arg(short = 'f', long = "from", value_name = "FORMAT")]
    pub from: Option<String>,

    /// Output format [default: json]
    #[arg(short = 't', long = "to", value_name = "FORMAT")]
    pub to: Option<String>,

    /// Don't read commands from stdin
    #[arg(short = 'n', long = "no-commands")]
    pub no_commands: bool,

    /// Path separator used by commands [default: /]
    #[arg(short = 'S', long = "separator", value_name = "SEP")]
    pub separator: Option<String>,

    /// How header keys are quoted in the tree
    #[arg(long, value_enum)]
    pub key_style: Option<KeyStyle>,

    /// Emit one block per header key instead of merging identical blocks
    #[arg(long)]
    pub no_compact: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a commented settings template and exit
    #[arg(long)]
    pub print_settings: bool,

    /// Document to read; `-` or nothing means stdin
    pub file: Option<PathBuf>,
}

impl CliArgs {
    /// Flags that were given, as settings keys. Absent flags leave lower
    /// layers alone.
    pub fn overrides(&self) -> Vec<(String, Value)> {
        let mut overrides = Vec::new();
        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                overrides.push((key.to_string(), value));
            }
        };
        set("from", self.from.clone().map(Value::String));
        set("to", self.to.clone().map(Value::String));
        set("separator", self.separator.clone().map(Value::String));
        set(
            "key_style",
            self.key_style.map(|style| {
                Value::String(
                    match style {
                        KeyStyle::Quote => "quote",
                        KeyStyle::Percent => "percent",
                    }
                    .into(),
                )
            }),
        );
        set("compact", self.no_compact.then_some(Value::Boolean(false)));
        overrides
    }

    /// Reading the document from stdin leaves no stdin for commands, so it
    /// implies `-n`.
    pub fn into_invocation(self) -> Invocation {
        let input = match self.file {
            None => InputSource::Stdin,
            Some(path) if path.as_os_str() == "-" => InputSource::Stdin,
            Some(path) => InputSource::File(path),
        };
        let run_commands = !self.no_commands && input != InputSource::Stdin;
        Invocation {
            input,
            run_commands,
            print_settings: self.print_settings,
            verbose: self.verbose,
        }
    }
}
