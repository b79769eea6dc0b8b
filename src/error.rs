use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfedError {
    #[error("Unterminated block for directive '{directive}' opened at line {line}, column {column}")]
    UnterminatedBlock {
        directive: String,
        line: usize,
        column: usize,
    },

    #[error("Malformed parameter line in '{directive}': unexpected '{token}' at line {line}, column {column}")]
    MalformedParamLine {
        directive: String,
        token: String,
        line: usize,
        column: usize,
    },

    #[error("Unterminated quoted string starting at line {line}, column {column}")]
    UnterminatedQuote { line: usize, column: usize },

    #[error("Unexpected '{token}' at line {line}, column {column}")]
    UnexpectedToken {
        token: String,
        line: usize,
        column: usize,
    },

    #[error("Schema conflict at '{path}': a value and a table cannot share a path")]
    SchemaConflict { path: String },

    #[error("Cannot render '{path}' as a directive: {reason}")]
    ReconstructionError { path: String, reason: String },

    #[error("Unknown format '{0}'")]
    UnknownFormat(String),

    #[error("Format '{0}' is already registered")]
    DuplicateFormat(String),

    #[error("Failed to decode {format}: {reason}")]
    Decode { format: String, reason: String },

    #[error("Failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },

    #[error("Input is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Line {line}: {reason}")]
    InvalidCommand { line: usize, reason: String },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownSettingsKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in settings file")]
    UnknownSettingsKeys(Vec<ConfedError>),

    #[error("Failed to parse {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Settings error: {0}")]
    SettingsError(#[from] confique::Error),

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfedError {
    pub(crate) fn decode(format: &str, reason: impl ToString) -> Self {
        ConfedError::Decode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(format: &str, reason: impl ToString) -> Self {
        ConfedError::Encode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_block_formats_correctly() {
        let err = ConfedError::UnterminatedBlock {
            directive: "proxy".into(),
            line: 12,
            column: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("proxy"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn schema_conflict_names_path() {
        let err = ConfedError::SchemaConflict {
            path: "site.log.args".into(),
        };
        assert!(err.to_string().contains("site.log.args"));
    }

    #[test]
    fn unknown_settings_key_formats() {
        let err = ConfedError::UnknownSettingsKey {
            key: "typo_key".into(),
            path: "/home/user/.config/confed/confed.toml".into(),
            line: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("typo_key"));
        assert!(msg.contains("confed.toml"));
        assert!(msg.contains('3'));
    }
}
