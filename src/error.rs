//! Unified error types for the server.
//!
//! Two families live here:
//!
//! - [`Error`]: setup-time and I/O failures returned to the integrator
//!   through [`Result`]. All variants are `Copy`.
//! - [`RpcErrorCode`]: the protocol-level codes placed in a response's
//!   `error.code`. These never leave the engine as Rust errors; they are
//!   written to the client.

use core::fmt;

use crate::ports::{StoreError, TransportError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible setup or I/O operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A fixed-capacity collection is full. Carries the collection name.
    CapacityExceeded(&'static str),
    /// A name is already registered in the target collection.
    DuplicateName(&'static str),
    /// The method already has a callback.
    CallbackAlreadyAttached(&'static str),
    /// Registering the slot would overrun the persistent store.
    StoreFull { needed: usize, capacity: usize },
    /// A value does not fit its declared shape.
    InvalidValue(&'static str),
    /// The persistent store failed.
    Storage(StoreError),
    /// A byte channel failed.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded(what) => write!(f, "capacity exceeded: {what}"),
            Self::DuplicateName(name) => write!(f, "duplicate name: {name}"),
            Self::CallbackAlreadyAttached(name) => write!(f, "callback already attached: {name}"),
            Self::StoreFull { needed, capacity } => {
                write!(f, "store full: {needed} bytes needed, capacity {capacity}")
            }
            Self::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol error codes
// ---------------------------------------------------------------------------

/// Error codes written to `error.code`.
///
/// Numbering follows JSON-RPC 2.0 so generic clients can classify them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    /// Request text is not a valid JSON array or exceeds the token limit.
    ParseError,
    /// Element 0 does not resolve to a method or field.
    MethodNotFound,
    /// Wrong argument count, failed validation, unknown help target.
    InvalidParams,
    /// Framing failures and handler-reported errors.
    ServerError,
}

impl RpcErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::ServerError => -32000,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::ServerError => "Server error",
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
