//! Lexer - turns Tempo source text into positioned tokens
//!
//! The token rules live in `tokens.pest` and are shared with the program
//! grammar, so `tokenize` and [`crate::parser::parse_program`] always agree on
//! where one token ends and the next begins.

use pest::Parser;
use pest_derive::Parser;
use serde::Serialize;
use thiserror::Error;

use crate::errors::{ErrorKind, ScriptError};
use crate::executor::types::Span;


#[derive(Parser)]
#[grammar = "lexer/tokens.pest"]
struct TokenScanner;

/* ===================== Tokens ===================== */

/// Position of a token in the source (1-indexed line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    /// Byte offset
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Integer,
    Float,
    String,
    Bool,
    Nil,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token
    pub lexeme: String,
    /// Decoded value for string literals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub position: Position,
}

/* ===================== Errors ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at line {}, col {}", position.line, position.column)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl From<LexError> for ScriptError {
    fn from(err: LexError) -> Self {
        let line = err.position.line.saturating_sub(1);
        let col = err.position.column.saturating_sub(1);
        let span = Span::new(
            err.position.offset,
            err.position.offset,
            line,
            col,
            line,
            col + 1,
        );
        ScriptError::at(ErrorKind::LexicalError, err.message, span)
    }
}

fn lex_error(err: pest::error::Error<Rule>, source: &str) -> LexError {
    let offset = match err.location {
        pest::error::InputLocation::Pos(pos) => pos,
        pest::error::InputLocation::Span((start, _)) => start,
    };
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos(pos) => pos,
        pest::error::LineColLocation::Span(start, _) => start,
    };
    let (mut offset, mut column) = (offset, column);
    let in_number = source[offset..].starts_with(|c: char| c.is_ascii_digit());
    if in_number {
        // Point at the character that breaks the literal, not at its first digit
        let valid = number_prefix_len(&source[offset..]);
        offset += valid;
        column += valid;
    }

    let message = match source[offset..].chars().next() {
        Some('"') => "invalid string literal".to_string(),
        Some(ch) if in_number => format!(
            "unexpected character '{}' in number literal",
            ch.escape_default()
        ),
        Some(ch) => format!("unexpected character '{}'", ch.escape_default()),
        None => "unexpected end of input".to_string(),
    };
    LexError {
        message,
        position: Position {
            line,
            column,
            offset,
        },
    }
}

/// Length of the longest well-formed number at the start of `text`
fn number_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut len = digits_from(0);
    if bytes.get(len) == Some(&b'.') {
        let fraction = digits_from(len + 1);
        if fraction > 0 {
            len += 1 + fraction;
        }
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(len + 1), Some(b'+' | b'-')));
        let exponent = digits_from(len + 1 + sign);
        if exponent > 0 {
            len += 1 + sign + exponent;
        }
    }
    len
}

/* ===================== Public API ===================== */

/// Split source text into tokens, skipping whitespace and comments
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let stream = TokenScanner::parse(Rule::token_stream, source)
        .map_err(|e| lex_error(e, source))?
        .next()
        .map(|pair| pair.into_inner())
        .into_iter()
        .flatten();

    let mut tokens = Vec::new();
    for pair in stream {
        let (line, column) = pair.line_col();
        let position = Position {
            line,
            column,
            offset: pair.as_span().start(),
        };
        let kind = match pair.as_rule() {
            Rule::EOI => break,
            Rule::unterminated_string => {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    position,
                })
            }
            Rule::keyword => match pair.as_str() {
                "true" | "false" => TokenKind::Bool,
                "nil" => TokenKind::Nil,
                _ => TokenKind::Keyword,
            },
            Rule::identifier => TokenKind::Identifier,
            Rule::integer => TokenKind::Integer,
            Rule::float => TokenKind::Float,
            Rule::string => TokenKind::String,
            _ => TokenKind::Punct,
        };
        let value = match kind {
            TokenKind::String => {
                let raw = pair.as_str();
                Some(unescape(&raw[1..raw.len() - 1]))
            }
            _ => None,
        };
        tokens.push(Token {
            kind,
            lexeme: pair.as_str().to_string(),
            value,
            position,
        });
    }
    Ok(tokens)
}

/// Decode the escape sequences of a string literal body
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
