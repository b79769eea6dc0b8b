//! Tool settings: which formats to convert between and how.
//!
//! Settings come from layers, later ones winning:
//!
//! ```text
//! Compiled defaults     #[config(default = ...)]
//!        ↑ overridden by
//! Settings files        <platform config dir>/confed.toml, then ./confed.toml
//!        ↑ overridden by
//! Environment vars      CONFED_FROM, CONFED_KEY_STYLE, ...
//!        ↑ overridden by
//! Command-line flags
//! ```
//!
//! Every layer is sparse. Files are checked strictly: a key `Settings` does
//! not know is reported with its file and line.
//!
//! [`resolve`] does no I/O; [`load`] gathers the real files and environment
//! and hands them to it.

use std::path::{Path, PathBuf};

use confique::Config;
use serde::Serialize;
use toml::{Table, Value};
use tracing::debug;

use crate::directive::RenderOptions;
use crate::error::ConfedError;
use crate::types::KeyStyle;

pub const APP_NAME: &str = "confed";
pub const FILE_NAME: &str = "confed.toml";
pub const ENV_PREFIX: &str = "CONFED_";

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Format of the input document (caddy, json, toml, yaml).
    #[config(default = "json")]
    pub from: String,

    /// Format of the output document.
    #[config(default = "json")]
    pub to: String,

    /// Separator between path segments in edit commands.
    #[config(default = "/")]
    pub separator: String,

    /// How directive header keys are stored as tree keys: "quote" wraps keys
    /// such as `https://0.0.0.0:443` in double quotes, "percent" escapes the
    /// dots as %2E.
    #[config(default = "quote")]
    pub key_style: KeyStyle,

    /// Merge directive blocks with identical bodies under one header line.
    #[config(default = true)]
    pub compact: bool,
}

impl Settings {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            key_style: self.key_style,
            compact: self.compact,
        }
    }
}

/// Everything [`resolve`] needs, already read.
#[derive(Debug, Default)]
pub struct SettingsInput {
    /// File contents, lowest priority first.
    pub files: Vec<(PathBuf, String)>,
    /// Raw environment pairs; only `CONFED_*` ones are used.
    pub env_vars: Vec<(String, String)>,
    /// Flag values by settings key.
    pub overrides: Vec<(String, Value)>,
}

/// Merge every layer into a [`Settings`].
pub fn resolve(input: SettingsInput) -> Result<Settings, ConfedError> {
    let mut merged = Table::new();

    for (path, content) in &input.files {
        validate_unknown_keys(content, path)?;
        let table: Table = toml::from_str(content).map_err(|e| ConfedError::SettingsParse {
            path: path.clone(),
            source: e,
        })?;
        merged.extend(table);
    }
    merged.extend(env_to_table(input.env_vars));
    merged.extend(input.overrides);

    let layer: <Settings as Config>::Layer =
        Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfedError::SettingsParse {
                path: PathBuf::from("<merged>"),
                source: e,
            })?;

    Settings::builder()
        .preloaded(layer)
        .load()
        .map_err(ConfedError::from)
}

/// Read the settings files and environment, then [`resolve`] with
/// `overrides` on top.
pub fn load(overrides: Vec<(String, Value)>) -> Result<Settings, ConfedError> {
    let files = load_files(&search_dirs(), FILE_NAME)?;
    for (path, _) in &files {
        debug!(path = %path.display(), "settings file");
    }
    resolve(SettingsInput {
        files,
        env_vars: std::env::vars().collect(),
        overrides,
    })
}

/// Directories searched for settings files, lowest priority first.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(proj) = directories::ProjectDirs::from("", "", APP_NAME) {
        dirs.push(proj.config_dir().to_path_buf());
    }
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    dirs
}

/// Read `{dir}/{file_name}` from every directory that has one. Missing files
/// are skipped; other I/O errors are returned.
pub fn load_files(dirs: &[PathBuf], file_name: &str) -> Result<Vec<(PathBuf, String)>, ConfedError> {
    let mut results = Vec::new();
    for dir in dirs {
        let file_path = dir.join(file_name);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => results.push((file_path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(ConfedError::IoError {
                    path: file_path,
                    source: e,
                });
            }
        }
    }
    Ok(results)
}

/// A commented TOML template listing every setting and its default.
pub fn template() -> String {
    confique::toml::template::<Settings>(confique::toml::FormatOptions::default())
}

/// Map `CONFED_KEY_STYLE=percent` to `key_style = "percent"`. `true` and
/// `false` become booleans, everything else stays a string. Variables that
/// name no setting are ignored.
fn env_to_table(vars: impl IntoIterator<Item = (String, String)>) -> Table {
    let mut table = Table::new();
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let name = rest.to_lowercase();
        if !Settings::META.fields.iter().any(|f| f.name == name) {
            continue;
        }
        let value = if value.eq_ignore_ascii_case("true") {
            Value::Boolean(true)
        } else if value.eq_ignore_ascii_case("false") {
            Value::Boolean(false)
        } else {
            Value::String(value)
        };
        table.insert(name, value);
    }
    table
}

/// Reject keys a settings file sets that [`Settings`] does not have.
fn validate_unknown_keys(content: &str, path: &Path) -> Result<(), ConfedError> {
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let _layer: <Settings as Config>::Layer = serde_ignored::deserialize(deserializer, |ignored| {
        unknown_keys.push(ignored.to_string());
    })
    .map_err(|e| ConfedError::SettingsParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    if unknown_keys.is_empty() {
        return Ok(());
    }

    let errors = unknown_keys
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            ConfedError::UnknownSettingsKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();
    Err(ConfedError::UnknownSettingsKeys(errors))
}

/// 1-based line where `dotted_key` is set, 0 if not found. An ignored
/// table is found by its `[header]`, a key by its assignment inside the
/// section its prefix names.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let Some((leaf, expected_section)) = segments.split_last() else {
        return 0;
    };

    let mut current_section: Vec<&str> = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('[') {
            let header = header.trim_start_matches('[');
            let header = header.trim_end_matches(']').trim();
            current_section = header.split('.').map(str::trim).collect();
            if current_section.starts_with(&segments) {
                return i + 1;
            }
            continue;
        }

        if current_section == expected_section
            && let Some(after) = trimmed.strip_prefix(leaf)
            && after.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
