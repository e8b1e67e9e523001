//! modserver: an embedded JSON-array RPC server.
//!
//! A device registers methods (named, schema-described callables) and
//! fields (named values persisted in a byte store), then polls one or more
//! byte channels. Each newline-terminated request `[method, args…]` gets
//! exactly one newline-terminated JSON response.
//!
//! ```text
//!   schema ──▶ method ──┐
//!      │                ├──▶ registry ──▶ server ◀── ports ◀── adapters
//!      └──▶ field ◀─ storage
//! ```
//!
//! Everything outside `adapters::nvs` and `adapters::uart` runs on the host,
//! which is how the test suite exercises it.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod field;
pub mod method;
pub mod ports;
pub mod registry;
pub mod schema;
pub mod server;
pub mod storage;

pub use error::{Error, Result, RpcErrorCode};
pub use server::{Request, Server};
