//! Token-to-directive grammar.
//!
//! A block hands over, per directive name, the tokens of every occurrence of
//! that directive concatenated in source order. [`group`] cuts them back into
//! occurrences and parses each one:
//!
//! ```text
//! proxy / localhost:8080 {      main = proxy ["/", "localhost:8080"]
//!     header_upstream -Proxy "" params[0] = header_upstream ["-Proxy", ""]
//!     transparent               params[1] = transparent []
//! }
//! ```
//!
//! A param line is whatever sits on one source line inside the braces; its
//! arguments never continue onto the next line.

use crate::error::ConfedError;

use super::tokenizer::{Token, starts_line};

/// A name followed by its arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub name: String,
    pub args: Vec<String>,
}

impl Line {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

/// One occurrence of a directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    pub main: Line,
    pub params: Vec<Line>,
    /// A `{ ... }` body was present, even if empty. Projection treats an
    /// empty body and no body alike.
    pub has_body: bool,
}

/// Split `tokens` into occurrences of `name` and parse each one.
pub fn group(tokens: &[Token], name: &str) -> Result<Vec<Directive>, ConfedError> {
    split_runs(tokens, name)
        .into_iter()
        .map(|run| parse_run(run, name))
        .collect()
}

/// Cut at every token equal to `name` that starts a source line outside any
/// braces. Never yields an empty run.
fn split_runs<'a>(tokens: &'a [Token], name: &str) -> Vec<&'a [Token]> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        if i > start && depth == 0 && starts_line(tokens, i) && token.text == name {
            runs.push(&tokens[start..i]);
            start = i;
        }
        if token.is_open() {
            depth += 1;
        } else if token.is_close() {
            depth = depth.saturating_sub(1);
        }
    }
    if start < tokens.len() {
        runs.push(&tokens[start..]);
    }
    runs
}

fn parse_run(run: &[Token], name: &str) -> Result<Directive, ConfedError> {
    let mut dir = Directive {
        main: Line::new(name),
        ..Directive::default()
    };

    // The first token is the directive name itself.
    let mut tokens = run.iter().skip(1);

    let mut open = None;
    for token in tokens.by_ref() {
        if token.is_open() {
            open = Some(token);
            break;
        }
        dir.main.args.push(token.text.clone());
    }
    let Some(open) = open else {
        return Ok(dir);
    };
    dir.has_body = true;

    let mut param: Option<Line> = None;
    let mut prev_end = None;
    while let Some(token) = tokens.next() {
        if token.is_close() {
            dir.params.extend(param.take());
            if let Some(extra) = tokens.next() {
                return Err(ConfedError::UnexpectedToken {
                    token: extra.text.clone(),
                    line: extra.line,
                    column: extra.column,
                });
            }
            return Ok(dir);
        }
        if token.is_open() {
            return Err(malformed(name, token));
        }

        if prev_end != Some(token.line) {
            dir.params.extend(param.take());
            param = Some(Line::new(token.text.clone()));
        } else if let Some(current) = param.as_mut() {
            current.args.push(token.text.clone());
        } else {
            return Err(malformed(name, token));
        }
        prev_end = Some(token.end_line);
    }

    Err(ConfedError::UnterminatedBlock {
        directive: name.to_string(),
        line: open.line,
        column: open.column,
    })
}

fn malformed(name: &str, token: &Token) -> ConfedError {
    ConfedError::MalformedParamLine {
        directive: name.to_string(),
        token: token.text.clone(),
        line: token.line,
        column: token.column,
    }
}
