//! Request text → request array.
//!
//! | First character | Handling                                   |
//! |-----------------|--------------------------------------------|
//! | `{`             | rejected: object requests are unsupported  |
//! | `[`             | parsed as a JSON array, compact response   |
//! | anything else   | bare text wrapped into an array, pretty    |
//!
//! Bare text is split on whitespace, keeping quoted strings and bracketed
//! groups whole: `setValue [1, 2] "a b"` becomes
//! `["setValue", [1,2], "a b"]`. Tokens that parse as JSON keep their type;
//! everything else becomes a string.

use serde_json::Value;

use super::response::{Failure, error_data};
use crate::config::JSON_TOKEN_MAX;
use crate::error::RpcErrorCode;

pub(crate) const OBJECT_REQUEST: &str = "Object requests not supported. Must use array format.";
pub(crate) const REQUEST_TOO_LONG: &str = "Request length too long.";

#[derive(Debug, PartialEq)]
pub(crate) struct ParsedRequest {
    pub items: Vec<Value>,
    /// Bare-text requests get human-readable output.
    pub pretty: bool,
}

/// Parse one trimmed, non-empty request line.
pub(crate) fn parse_request(text: &str) -> Result<ParsedRequest, Failure> {
    let parse_error = || Failure::with_data(RpcErrorCode::ParseError, error_data(text));
    let (items, pretty) = match text.as_bytes().first() {
        Some(b'{') => {
            return Err(Failure::with_data(
                RpcErrorCode::ServerError,
                error_data(OBJECT_REQUEST),
            ));
        }
        Some(b'[') => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => (items, false),
            _ => return Err(parse_error()),
        },
        _ => (sanitize(text), true),
    };
    // The root array counts as one value.
    let total = 1 + items.iter().map(count_values).sum::<usize>();
    if total > JSON_TOKEN_MAX {
        return Err(parse_error());
    }
    Ok(ParsedRequest { items, pretty })
}

/// Number of JSON values in a tree, containers included.
pub(crate) fn count_values(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(count_values).sum::<usize>(),
        Value::Object(map) => 1 + map.values().map(count_values).sum::<usize>(),
        _ => 1,
    }
}

/// Wrap bare text into request items.
pub(crate) fn sanitize(text: &str) -> Vec<Value> {
    tokens(text)
        .into_iter()
        .map(|token| {
            serde_json::from_str::<Value>(token).unwrap_or_else(|_| Value::from(token))
        })
        .collect()
}

/// Whitespace-separated tokens; quotes and brackets group.
fn tokens(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if start.is_none() {
            if b.is_ascii_whitespace() {
                continue;
            }
            start = Some(i);
        }
        if in_quotes {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_quotes = false;
            }
            continue;
        }
        match b {
            b'"' => in_quotes = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ if b.is_ascii_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    out.push(&text[s..i]);
                }
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(&text[s..]);
    }
    out
}
