//! Shell-style command lines to JavaScript call expressions.
//!
//! `greet Alice "Dr. Bob" 7 true` becomes `greet("Alice", "Dr. Bob", 7, true)`.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const NUMERIC_PATTERN: &str = r"^[+-]?[0-9]+(\.[0-9]+)?$";

// Constant pattern, compiled once; covered by `numeric_pattern_compiles`.
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMERIC_PATTERN).expect("NUMERIC_PATTERN is a valid regex"));

const BARE_LITERALS: &[&str] = &["true", "false", "null", "undefined"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
}

/// Render `input` as a call expression. An empty (or blank) input renders as
/// an empty string; see [`try_parse_call`] for the checked form.
pub fn parse_call(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.contains('(') && trimmed.contains(')') {
        return trimmed.to_string();
    }

    let Some(split) = trimmed.find(is_separator) else {
        return format!("{trimmed}()");
    };
    let (name, rest) = trimmed.split_at(split);

    let args: Vec<String> = tokenize(rest).iter().map(|arg| render_arg(arg)).collect();
    format!("{name}({})", args.join(", "))
}

pub fn try_parse_call(input: &str) -> Result<String, ParseError> {
    let call = parse_call(input);
    if call.is_empty() {
        Err(ParseError::Empty)
    } else {
        Ok(call)
    }
}

fn is_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Split on whitespace outside quoted spans. Quoted spans keep their quotes;
/// an unterminated quote swallows the rest of the line.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for c in input.chars() {
        let escaped = prev == Some('\\');
        match quote {
            None if (c == '"' || c == '\'') && !escaped => {
                quote = Some(c);
                current.push(c);
            }
            Some(open) if c == open && !escaped => {
                quote = None;
                current.push(c);
            }
            None if is_separator(c) => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
        prev = Some(c);
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub fn is_numeric(token: &str) -> bool {
    NUMERIC.is_match(token)
}

fn render_arg(arg: &str) -> String {
    if is_numeric(arg) || BARE_LITERALS.contains(&arg) || arg.starts_with(['"', '\'']) {
        arg.to_string()
    } else {
        format!("\"{}\"", escape_string(arg))
    }
}

/// Escape for a double-quoted JavaScript string literal.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}
