//! Tokenizer for the directive language.
//!
//! Splits the document into whitespace-delimited tokens tagged with their
//! 1-based line and column, strips `#` comments, unwraps `"quoted"` tokens,
//! then cuts the token stream into top-level [`Block`]s:
//!
//! ```text
//! https://a.example:443 https://b.example:443 {   <- header keys
//!     log /var/log/site.log                        <- directive "log"
//!     proxy / localhost:8080 {                     <- directive "proxy"
//!         transparent
//!     }
//! }
//! ```
//!
//! Placeholders such as `{$HOME}` or `{remote}` are ordinary tokens; only an
//! unquoted token that is exactly `{` or `}` is a brace. A quoted token may
//! span lines; the next token continues its logical line when it starts on
//! the line the quoted token ended on.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::ConfedError;

/// One whitespace-delimited token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: usize,
    pub column: usize,
    /// Line of the last character; differs from `line` only for a quoted
    /// token holding a newline.
    pub end_line: usize,
    pub quoted: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            text: text.into(),
            line,
            column,
            end_line: line,
            quoted: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.quoted && self.text == "{"
    }

    pub fn is_close(&self) -> bool {
        !self.quoted && self.text == "}"
    }
}

/// Whether `tokens[i]` begins a new source line.
pub(crate) fn starts_line(tokens: &[Token], i: usize) -> bool {
    i == 0 || tokens[i - 1].end_line != tokens[i].line
}

/// A top-level unit: its header keys and the tokens of every directive in
/// its body, grouped by directive name in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub keys: Vec<String>,
    pub tokens: IndexMap<String, Vec<Token>>,
}

/// Tokenize a whole document into blocks.
///
/// The first block may omit its braces, in which case the rest of the
/// document is its body. Every later block must be braced.
pub fn tokenize(input: &str) -> Result<Vec<Block>, ConfedError> {
    let tokens = lex(input)?;
    let mut blocks = Vec::new();
    let mut pos = 0;

    while pos < tokens.len() {
        let first = &tokens[pos];
        if first.is_open() || first.is_close() {
            return Err(unexpected(first));
        }

        let mut keys = Vec::new();
        push_key(&mut keys, first);
        pos += 1;
        while pos < tokens.len() && !tokens[pos].is_open() {
            let prev = &tokens[pos - 1];
            let token = &tokens[pos];
            if starts_line(&tokens, pos) && !prev.text.ends_with(',') {
                break;
            }
            if token.is_close() {
                return Err(unexpected(token));
            }
            push_key(&mut keys, token);
            pos += 1;
        }

        let body = if pos < tokens.len() && tokens[pos].is_open() {
            let open = &tokens[pos];
            let end = matching_close(&tokens, pos).ok_or_else(|| ConfedError::UnterminatedBlock {
                directive: keys.join(" "),
                line: open.line,
                column: open.column,
            })?;
            let body = &tokens[pos + 1..end];
            pos = end + 1;
            body
        } else if blocks.is_empty() {
            let body = &tokens[pos..];
            pos = tokens.len();
            body
        } else {
            // Only reachable with a token left on a new line after the keys.
            return Err(unexpected(&tokens[pos]));
        };

        debug!(keys = ?keys, tokens = body.len(), "block");
        blocks.push(Block {
            keys,
            tokens: by_directive(body)?,
        });
    }

    Ok(blocks)
}

/// Header keys may be separated by commas (`a.com, b.com {`). A quoted key
/// is taken verbatim, even when empty.
fn push_key(keys: &mut Vec<String>, token: &Token) {
    if token.quoted {
        keys.push(token.text.clone());
        return;
    }
    let key = token.text.trim_end_matches(',');
    if !key.is_empty() {
        keys.push(key.to_string());
    }
}

fn unexpected(token: &Token) -> ConfedError {
    ConfedError::UnexpectedToken {
        token: token.text.clone(),
        line: token.line,
        column: token.column,
    }
}

/// Index of the `}` that closes the `{` at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_open() {
            depth += 1;
        } else if token.is_close() {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Partition a block body by directive name. A directive starts at the first
/// token of a line outside any directive's braces.
fn by_directive(body: &[Token]) -> Result<IndexMap<String, Vec<Token>>, ConfedError> {
    let mut grouped: IndexMap<String, Vec<Token>> = IndexMap::new();
    let mut current: Option<String> = None;
    let mut depth = 0usize;

    for (i, token) in body.iter().enumerate() {
        if depth == 0 && starts_line(body, i) {
            if token.is_open() || token.is_close() {
                return Err(unexpected(token));
            }
            current = Some(token.text.clone());
        }
        if token.is_open() {
            depth += 1;
        } else if token.is_close() {
            depth = depth.checked_sub(1).ok_or_else(|| unexpected(token))?;
        }
        if let Some(name) = &current {
            grouped.entry(name.clone()).or_default().push(token.clone());
        }
    }

    Ok(grouped)
}

/// Split raw text into tokens.
pub fn lex(input: &str) -> Result<Vec<Token>, ConfedError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        trace!("Token {:?} at {}:{}", token.text, token.line, token.column);
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'src> {
    remaining: std::str::Chars<'src>,
    line: usize,
    column: usize,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            remaining: source.chars(),
            line: 1,
            column: 1,
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.clone().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.remaining.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ConfedError> {
        self.skip_whitespace_and_comments();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let mut text = String::new();
        let quoted = c == '"';
        if quoted {
            self.advance();
            loop {
                match self.advance() {
                    None => return Err(ConfedError::UnterminatedQuote { line, column }),
                    Some('"') => break,
                    Some('\\') if matches!(self.peek(), Some('"' | '\\')) => {
                        if let Some(escaped) = self.advance() {
                            text.push(escaped);
                        }
                    }
                    Some(other) => text.push(other),
                }
            }
        } else {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                self.advance();
            }
        }

        Ok(Some(Token {
            text,
            line,
            column,
            end_line: self.line,
            quoted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn lex_tracks_lines_and_columns() {
        let tokens = lex("log a.log\n\tgzip").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new("log", 1, 1),
                Token::new("a.log", 1, 5),
                Token::new("gzip", 2, 2),
            ]
        );
    }

    #[test]
    fn lex_strips_comments() {
        let tokens = lex("# heading\nlog x # trailing\n#proxy / y\n").unwrap();
        assert_eq!(texts(&tokens), vec!["log", "x"]);
    }

    #[test]
    fn lex_unwraps_quotes() {
        let tokens = lex(r#"header_upstream -Proxy "" "a b" "q\"x" "c:\\d""#).unwrap();
        assert_eq!(
            texts(&tokens),
            vec!["header_upstream", "-Proxy", "", "a b", "q\"x", "c:\\d"]
        );
    }

    #[test]
    fn lex_keeps_unknown_escapes() {
        let tokens = lex(r#""a\.b""#).unwrap();
        assert_eq!(texts(&tokens), vec!["a\\.b"]);
    }

    #[test]
    fn lex_unterminated_quote() {
        let err = lex("log \"oops").unwrap_err();
        assert!(matches!(
            err,
            ConfedError::UnterminatedQuote { line: 1, column: 5 }
        ));
    }

    #[test]
    fn placeholders_are_plain_tokens() {
        let tokens = lex("proxy / localhost:{$PORT} {remote}").unwrap();
        assert_eq!(texts(&tokens), vec!["proxy", "/", "localhost:{$PORT}", "{remote}"]);
        assert!(tokens.iter().all(|t| !t.is_open() && !t.is_close()));
    }

    #[test]
    fn single_block_with_directives() {
        let blocks = tokenize("localhost:80 {\n\tlog a.log\n\tgzip\n}\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].keys, vec!["localhost:80"]);
        let names: Vec<&str> = blocks[0].tokens.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["log", "gzip"]);
        assert_eq!(texts(&blocks[0].tokens["log"]), vec!["log", "a.log"]);
    }

    #[test]
    fn multiple_header_keys() {
        let blocks = tokenize("a.com, b.com {\n\tgzip\n}\nc.com d.com {\n\tgzip\n}\n").unwrap();
        assert_eq!(blocks[0].keys, vec!["a.com", "b.com"]);
        assert_eq!(blocks[1].keys, vec!["c.com", "d.com"]);
    }

    #[test]
    fn keys_continue_after_trailing_comma() {
        let blocks = tokenize("a.com,\nb.com {\n\tgzip\n}\n").unwrap();
        assert_eq!(blocks[0].keys, vec!["a.com", "b.com"]);
    }

    #[test]
    fn repeated_directive_tokens_are_concatenated() {
        let input = "site {\n\tproxy /a x {\n\t\twithout /a\n\t}\n\tlog l\n\tproxy /b y\n}\n";
        let blocks = tokenize(input).unwrap();
        assert_eq!(
            texts(&blocks[0].tokens["proxy"]),
            vec!["proxy", "/a", "x", "{", "without", "/a", "}", "proxy", "/b", "y"]
        );
    }

    #[test]
    fn param_named_like_a_directive_stays_in_its_body() {
        let input = "site {\n\trewrite {\n\t\tlog x\n\t}\n\tlog y\n}\n";
        let blocks = tokenize(input).unwrap();
        assert_eq!(
            texts(&blocks[0].tokens["rewrite"]),
            vec!["rewrite", "{", "log", "x", "}"]
        );
        assert_eq!(texts(&blocks[0].tokens["log"]), vec!["log", "y"]);
    }

    #[test]
    fn unbraced_first_block() {
        let blocks = tokenize("localhost:2015\ngzip\nlog a.log\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].keys, vec!["localhost:2015"]);
        assert_eq!(blocks[0].tokens.len(), 2);
    }

    #[test]
    fn unterminated_site_block() {
        let err = tokenize("foo { bar").unwrap_err();
        match err {
            ConfedError::UnterminatedBlock {
                directive,
                line,
                column,
            } => {
                assert_eq!(directive, "foo");
                assert_eq!((line, column), (1, 5));
            }
            other => panic!("Expected UnterminatedBlock, got {other:?}"),
        }
    }

    #[test]
    fn stray_close_brace() {
        assert!(matches!(
            tokenize("}"),
            Err(ConfedError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn second_block_without_braces_is_rejected() {
        let result = tokenize("a.com {\n\tgzip\n}\nb.com\ngzip\n");
        assert!(matches!(result, Err(ConfedError::UnexpectedToken { .. })));
    }

    #[test]
    fn quoted_braces_are_plain_tokens() {
        let tokens = lex(r#"respond "{" "}" {"#).unwrap();
        assert_eq!(texts(&tokens), vec!["respond", "{", "}", "{"]);
        assert!(tokens[1].quoted && !tokens[1].is_open());
        assert!(tokens[2].quoted && !tokens[2].is_close());
        assert!(tokens[3].is_open());
    }

    #[test]
    fn quoted_brace_arg_does_not_open_a_block() {
        let blocks = tokenize("site {\n\trespond \"{\"\n\tgzip\n}\n").unwrap();
        assert_eq!(texts(&blocks[0].tokens["respond"]), vec!["respond", "{"]);
        assert_eq!(texts(&blocks[0].tokens["gzip"]), vec!["gzip"]);
    }

    #[test]
    fn quoted_token_spanning_lines() {
        let tokens = lex("respond \"a\nb\" c").unwrap();
        assert_eq!(texts(&tokens), vec!["respond", "a\nb", "c"]);
        assert_eq!((tokens[1].line, tokens[1].end_line), (1, 2));
        assert!(!starts_line(&tokens, 2));
    }

    #[test]
    fn multi_line_arg_keeps_following_args() {
        let blocks = tokenize("site {\n\trespond \"a\nb\" c\n\tgzip\n}\n").unwrap();
        let names: Vec<&str> = blocks[0].tokens.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["respond", "gzip"]);
        assert_eq!(texts(&blocks[0].tokens["respond"]), vec!["respond", "a\nb", "c"]);
    }

    #[test]
    fn empty_quoted_header_key_is_kept() {
        let blocks = tokenize("\"\" {\n\tgzip\n}\n").unwrap();
        assert_eq!(blocks[0].keys, vec![""]);
        assert_eq!(blocks[0].tokens.len(), 1);
    }

    #[test]
    fn empty_document_has_no_blocks() {
        assert!(tokenize("  # nothing here\n").unwrap().is_empty());
    }
}
