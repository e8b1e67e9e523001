//! Port traits: the boundary between the engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Server (engine)
//! ```
//!
//! Two collaborators are consumed through ports:
//!
//! - [`ByteStore`]: an addressable persistent byte array (EEPROM, an NVS
//!   blob, RAM in tests).
//! - [`Transport`]: a non-blocking bidirectional byte channel (UART, USB
//!   CDC, a task-to-task pipe).
//!
//! Concrete implementations live in [`crate::adapters`].

use core::fmt;

// ───────────────────────────────────────────────────────────────
// Persistent byte store (driven adapter: engine ↔ EEPROM / flash)
// ───────────────────────────────────────────────────────────────

/// Fixed-size, byte-addressable persistent storage.
///
/// Writes must be durable once `write_at` returns `Ok`. Reads of bytes
/// never written return whatever the medium holds (erased EEPROM reads
/// `0xFF`); the engine's sentinel check copes with that.
pub trait ByteStore {
    /// Total addressable bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset..offset + buf.len()`.
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Persist `data` at `offset..offset + data.len()`.
    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError>;
}

/// Errors from [`ByteStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The range falls outside the store.
    OutOfBounds,
    /// The underlying medium failed.
    IoError,
    /// Persisted bytes do not decode as the slot's declared shape.
    Corrupted,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored bytes corrupted"),
        }
    }
}

impl core::error::Error for StoreError {}

/// Bounds check shared by store implementations.
pub(crate) fn check_range(offset: usize, len: usize, capacity: usize) -> Result<(), StoreError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(StoreError::OutOfBounds),
    }
}

// ───────────────────────────────────────────────────────────────
// Byte channel (driving adapter: client ↔ engine)
// ───────────────────────────────────────────────────────────────

/// Byte-oriented, non-blocking transport channel.
///
/// The server never waits on a transport: it checks [`available`] and
/// reads only what is buffered.
///
/// [`available`]: Transport::available
pub trait Transport {
    /// Read up to `buf.len()` bytes. Returns 0 if nothing is buffered.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Whether a `read` would return data right now.
    fn available(&self) -> bool;

    /// Write all of `data`, retrying short writes.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), TransportError> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(TransportError::Full);
            }
            data = &data[n..];
        }
        Ok(())
    }
}

/// Errors from [`Transport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The peripheral or peer failed.
    IoError,
    /// The output side cannot accept more bytes.
    Full,
    /// The channel was closed.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error"),
            Self::Full => write!(f, "output full"),
            Self::Closed => write!(f, "channel closed"),
        }
    }
}

impl core::error::Error for TransportError {}
