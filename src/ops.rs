//! Edit commands: parsing script lines, applying them to a tree, and the
//! result types callers display.
//!
//! A script is one command per line:
//!
//! ```text
//! get  "https://0.0.0.0:443"/proxy
//! set  "https://0.0.0.0:443"/log/args /var/log/new.log
//! rm   "https://0.0.0.0:443"/gzip
//! print
//! ```
//!
//! Paths are split on the configured separator; quoted segments may contain
//! it.

use std::fmt;

use tracing::{debug, warn};

use crate::codec::{Codec, Registry};
use crate::error::ConfedError;
use crate::keys::split_path;
use crate::settings::Settings;
use crate::tree::{Tree, Value};
use crate::types::EditCommand;

/// Result of one command. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// The document will be printed once the script ends.
    MarkedForPrint,
    /// Every leaf with its path, sorted by path.
    Listing { entries: Vec<(String, String)> },
    /// A subtree encoded with the output format.
    Document(String),
    ValueSet { path: String, value: String },
    /// `found` is false when there was nothing at `path`.
    Removed { path: String, found: bool },
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::MarkedForPrint => Ok(()),
            CommandResult::Listing { entries } => {
                for (i, (path, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{path}: {value}")?;
                }
                Ok(())
            }
            CommandResult::Document(text) => write!(f, "{text}"),
            CommandResult::ValueSet { path, value } => write!(f, "Set {path} = {value}"),
            CommandResult::Removed { path, found: true } => write!(f, "Removed {path}"),
            CommandResult::Removed { path, found: false } => write!(f, "Nothing at {path}"),
        }
    }
}

/// What a whole script produced.
#[derive(Debug, Default)]
pub struct ScriptOutcome {
    /// Output of `get` and `dump`, in order.
    pub results: Vec<CommandResult>,
    /// Whether the edited document should be written out.
    pub print: bool,
    /// Lines that were reported and skipped.
    pub skipped: Vec<ConfedError>,
}

/// Parse one script line. Blank lines yield `None`.
pub fn parse_command(line: &str, line_no: usize) -> Result<Option<EditCommand>, ConfedError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let invalid = |reason: String| ConfedError::InvalidCommand {
        line: line_no,
        reason,
    };
    let require_path = |rest: &str| {
        if rest.is_empty() {
            Err(invalid(format!("'{name}' needs a path")))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match name {
        "print" => EditCommand::Print,
        "dump" => EditCommand::Dump,
        "get" => EditCommand::Get {
            path: require_path(rest)?,
        },
        "set" => {
            let (path, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            EditCommand::Set {
                path: require_path(path)?,
                value: value.to_string(),
            }
        }
        "rm" | "del" => EditCommand::Remove {
            path: require_path(rest)?,
        },
        other => return Err(invalid(format!("unknown command '{other}'"))),
    };
    Ok(Some(command))
}

/// Apply one command to `tree`. `output` encodes `get` results.
pub fn execute(
    tree: &mut Tree,
    command: &EditCommand,
    separator: &str,
    output: &dyn Codec,
) -> Result<CommandResult, ConfedError> {
    debug!(?command, "executing");
    match command {
        EditCommand::Print => Ok(CommandResult::MarkedForPrint),
        EditCommand::Dump => Ok(dump(tree, separator)),
        EditCommand::Get { path } => {
            let segments = split_path(path, separator);
            let value = tree
                .get_path(&segments)
                .ok_or_else(|| ConfedError::KeyNotFound(path.clone()))?;
            let subtree = match value {
                Value::Table(sub) => sub.clone(),
                leaf => [(path.clone(), leaf.clone())].into_iter().collect(),
            };
            let bytes = output.encode(&subtree)?;
            Ok(CommandResult::Document(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
        EditCommand::Set { path, value } => {
            let segments = split_path(path, separator);
            let stored = if value.is_empty() {
                Value::Empty
            } else {
                Value::Scalar(value.clone())
            };
            tree.set_path(&segments, stored)?;
            Ok(CommandResult::ValueSet {
                path: path.clone(),
                value: value.clone(),
            })
        }
        EditCommand::Remove { path } => {
            let segments = split_path(path, separator);
            let found = tree.delete_path(&segments).is_some();
            Ok(CommandResult::Removed {
                path: path.clone(),
                found,
            })
        }
    }
}

/// Run every line of `script` against `tree`.
///
/// The document is printed when a command asks for it, or when the script has
/// no lines at all. Any line, even a blank one, makes printing opt-in. `dump`
/// ends the script and suppresses the final print. Unknown or incomplete
/// lines are logged, collected in [`ScriptOutcome::skipped`] and otherwise
/// ignored; failures while executing abort the script.
pub fn run_script(
    tree: &mut Tree,
    script: &str,
    separator: &str,
    output: &dyn Codec,
) -> Result<ScriptOutcome, ConfedError> {
    let mut outcome = ScriptOutcome {
        print: script.lines().next().is_none(),
        ..ScriptOutcome::default()
    };

    for (i, line) in script.lines().enumerate() {
        let command = match parse_command(line, i + 1) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!("{err}");
                outcome.skipped.push(err);
                continue;
            }
        };

        let result = execute(tree, &command, separator, output)?;
        match command {
            EditCommand::Dump => {
                outcome.results.push(result);
                outcome.print = false;
                return Ok(outcome);
            }
            EditCommand::Get { .. } => outcome.results.push(result),
            EditCommand::Print | EditCommand::Set { .. } | EditCommand::Remove { .. } => {
                outcome.print = true;
            }
        }
    }

    Ok(outcome)
}

/// What one run of the tool should print.
#[derive(Debug, Default)]
pub struct SessionOutput {
    /// Command output, printed first.
    pub results: Vec<CommandResult>,
    /// The final document, if it is to be printed.
    pub document: Option<Vec<u8>>,
    pub skipped: Vec<ConfedError>,
}

/// Decode `input` with the `from` format, run `script` against it, and
/// encode the result with the `to` format. Without a script the converted
/// document is always produced.
pub fn run_session(
    registry: &Registry,
    settings: &Settings,
    input: &[u8],
    script: Option<&str>,
) -> Result<SessionOutput, ConfedError> {
    let output = registry.get(&settings.to)?;
    let mut tree = registry.decode(&settings.from, input)?;

    let Some(script) = script else {
        return Ok(SessionOutput {
            document: Some(output.encode(&tree)?),
            ..SessionOutput::default()
        });
    };

    let outcome = run_script(&mut tree, script, &settings.separator, output)?;
    let document = if outcome.print {
        Some(output.encode(&tree)?)
    } else {
        None
    };
    Ok(SessionOutput {
        results: outcome.results,
        document,
        skipped: outcome.skipped,
    })
}

fn dump(tree: &Tree, separator: &str) -> CommandResult {
    let mut entries: Vec<(String, String)> = tree
        .leaves(separator)
        .into_iter()
        .map(|(path, value)| (path, value.to_string()))
        .collect();
    entries.sort();
    CommandResult::Listing { entries }
}
