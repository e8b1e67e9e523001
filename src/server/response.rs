//! Response construction.
//!
//! Exactly one response object per request:
//!
//! ```text
//! {"id": <echo>, "result": <value>}
//! {"id": <echo>, "error": {"message": "...", "data": "...", "code": -326xx}}
//! ```
//!
//! The first writer wins: once a result or an error is set, later writes
//! are refused. A request that finishes with nothing written gets
//! `"result": null`.

use serde::Serialize;
use serde_json::Value;

use crate::config::ERROR_DATA_LEN_MAX;
use crate::error::RpcErrorCode;

/// Error text carried in `error.data`.
pub type ErrorData = heapless::String<ERROR_DATA_LEN_MAX>;

/// Build an [`ErrorData`], truncating at capacity.
pub(crate) fn error_data(text: &str) -> ErrorData {
    let mut out = ErrorData::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// A protocol error produced while handling a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub code: RpcErrorCode,
    pub data: Option<ErrorData>,
}

impl Failure {
    pub fn new(code: RpcErrorCode) -> Self {
        Self { code, data: None }
    }

    pub fn with_data(code: RpcErrorCode, data: ErrorData) -> Self {
        Self {
            code,
            data: Some(data),
        }
    }

    pub fn invalid_params(data: &str) -> Self {
        Self::with_data(RpcErrorCode::InvalidParams, error_data(data))
    }

    pub fn method_not_found() -> Self {
        Self::new(RpcErrorCode::MethodNotFound)
    }
}

/// Outcome of an engine-side operation (reserved method, field request).
pub(crate) type Reply = Result<Value, Failure>;

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Pending,
    Result(Value),
    Error {
        code: RpcErrorCode,
        data: Option<Value>,
    },
}

#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    id: Option<Value>,
    outcome: Outcome,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            outcome: Outcome::Pending,
        }
    }

    pub fn set_id(&mut self, id: Value) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn has_responded(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error { .. })
    }

    /// Returns `false` if a result or error was already written.
    pub fn write_result(&mut self, value: Value) -> bool {
        if self.has_responded() {
            return false;
        }
        self.outcome = Outcome::Result(value);
        true
    }

    /// Returns `false` if a result or error was already written.
    pub fn write_error(&mut self, code: RpcErrorCode, data: Option<Value>) -> bool {
        if self.has_responded() {
            return false;
        }
        self.outcome = Outcome::Error { code, data };
        true
    }

    pub(crate) fn write_reply(&mut self, reply: Reply) -> bool {
        match reply {
            Ok(value) => self.write_result(value),
            Err(failure) => self.write_failure(failure),
        }
    }

    pub(crate) fn write_failure(&mut self, failure: Failure) -> bool {
        let data = failure.data.map(|d| Value::from(d.as_str()));
        self.write_error(failure.code, data)
    }

    /// Serialise, newline terminated. Pending becomes `"result": null`.
    pub fn render(&self, pretty: bool) -> String {
        let null = Value::Null;
        let (error, result) = match &self.outcome {
            Outcome::Pending => (None, Some(&null)),
            Outcome::Result(value) => (None, Some(value)),
            Outcome::Error { code, data } => (
                Some(WireError {
                    message: code.message(),
                    data: data.as_ref(),
                    code: code.code(),
                }),
                None,
            ),
        };
        let wire = WireResponse {
            id: self.id.as_ref(),
            error,
            result,
        };
        let encoded = if pretty {
            serde_json::to_string_pretty(&wire)
        } else {
            serde_json::to_string(&wire)
        };
        let mut out = encoded.unwrap_or_else(|_| String::from(FALLBACK));
        out.push('\n');
        out
    }
}

/// Emitted only if serialisation itself fails.
const FALLBACK: &str = r#"{"error":{"message":"Server error","code":-32000}}"#;

// Field order here is key order on the wire.
#[derive(Serialize)]
struct WireResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<WireError<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
}

#[derive(Serialize)]
struct WireError<'a> {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    code: i32,
}
