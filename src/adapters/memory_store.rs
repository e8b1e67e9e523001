//! RAM-backed [`ByteStore`] for host builds and tests.
//!
//! Starts out erased (`0xFF`), like a fresh EEPROM, so the first
//! [`Server::start`](crate::server::Server::start) provisions defaults.
//! [`into_bytes`](MemoryStore::into_bytes) / [`from_bytes`](MemoryStore::from_bytes)
//! carry the image across a simulated reboot.

use log::debug;

use crate::ports::{ByteStore, StoreError, check_range};

const ERASED: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct MemoryStore {
    bytes: Vec<u8>,
    writes: usize,
}

impl MemoryStore {
    /// An erased store of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
            writes: 0,
        }
    }

    /// A store holding an existing image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of successful `write_at` calls.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Reset every byte to the erased value.
    pub fn erase(&mut self) {
        self.bytes.fill(ERASED);
    }
}

impl ByteStore for MemoryStore {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        check_range(offset, buf.len(), self.bytes.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError> {
        check_range(offset, data.len(), self.bytes.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.writes += 1;
        debug!("MemoryStore: {} bytes at {}", data.len(), offset);
        Ok(())
    }
}
