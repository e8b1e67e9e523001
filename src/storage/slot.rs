//! Durable slot: one value bound to RAM or to a fixed store offset.
//!
//! Reads and writes go straight through to the backing. The compiled-in
//! default never touches the store. No range checks happen here; the
//! owning field validates before delegating.

use log::warn;

use super::value::{Element, FieldValue};
use crate::ports::{ByteStore, StoreError};

#[derive(Debug, Clone)]
enum Backing {
    Ram(FieldValue),
    Persistent { offset: usize },
}

/// A value with a default and a RAM or persistent backing.
#[derive(Debug, Clone)]
pub struct Slot {
    default: FieldValue,
    backing: Backing,
}

impl Slot {
    /// RAM-only slot, initialised to its default.
    pub fn ram(default: FieldValue) -> Self {
        Self {
            backing: Backing::Ram(default.clone()),
            default,
        }
    }

    /// Slot persisted at `offset`. Offsets come from
    /// [`StorageLayout`](super::StorageLayout).
    pub(crate) fn persistent(default: FieldValue, offset: usize) -> Self {
        Self {
            default,
            backing: Backing::Persistent { offset },
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.backing, Backing::Persistent { .. })
    }

    pub fn offset(&self) -> Option<usize> {
        match self.backing {
            Backing::Persistent { offset } => Some(offset),
            Backing::Ram(_) => None,
        }
    }

    /// Bytes occupied in the store.
    pub fn width(&self) -> usize {
        self.default.encoded_len()
    }

    /// Declared element count (array length or string capacity).
    pub fn array_length(&self) -> usize {
        self.default.array_length()
    }

    pub fn default_value(&self) -> &FieldValue {
        &self.default
    }

    pub fn default_element(&self, index: usize) -> Option<Element> {
        self.default.element(index)
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn value(&self, store: &dyn ByteStore) -> Result<FieldValue, StoreError> {
        match &self.backing {
            Backing::Ram(v) => Ok(v.clone()),
            Backing::Persistent { offset } => {
                let mut buf = [0u8; MAX_SLOT_WIDTH];
                let bytes = &mut buf[..self.width()];
                store.read_at(*offset, bytes)?;
                self.default.decode_like(bytes)
            }
        }
    }

    pub fn element(&self, store: &dyn ByteStore, index: usize) -> Option<Element> {
        if index >= self.array_length() {
            return None;
        }
        self.value(store).ok()?.element(index)
    }

    pub fn is_default(&self, store: &dyn ByteStore) -> bool {
        self.value(store).is_ok_and(|v| v == self.default)
    }

    // ── Writes ────────────────────────────────────────────────

    /// Write a whole value. The shape must match the default's.
    pub fn set_value(&mut self, store: &mut dyn ByteStore, value: &FieldValue) -> bool {
        self.write(store, value).is_ok()
    }

    /// Write one element. Out-of-bounds indices change nothing.
    pub fn set_element(&mut self, store: &mut dyn ByteStore, index: usize, element: Element) -> bool {
        if index >= self.array_length() {
            return false;
        }
        match &mut self.backing {
            Backing::Ram(v) => v.set_element(index, element),
            Backing::Persistent { offset } => {
                // Validate against the current value first so a bad element
                // (wrong kind, gap in a string) never reaches the store.
                let Ok(mut current) = self.default.decode_like_store(store, *offset) else {
                    return false;
                };
                if !current.set_element(index, element) {
                    return false;
                }
                let width = self.default.element_width();
                let mut buf = [0u8; 8];
                FieldValue::encode_element(element, &mut buf[..width]);
                match store.write_at(*offset + index * width, &buf[..width]) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Store: element write at {} failed: {}", *offset, e);
                        false
                    }
                }
            }
        }
    }

    pub fn set_to_default(&mut self, store: &mut dyn ByteStore) -> bool {
        let default = self.default.clone();
        self.set_value(store, &default)
    }

    pub fn set_element_to_default(&mut self, store: &mut dyn ByteStore, index: usize) -> bool {
        match self.default.element(index) {
            Some(element) => self.set_element(store, index, element),
            None => false,
        }
    }

    pub(crate) fn write(
        &mut self,
        store: &mut dyn ByteStore,
        value: &FieldValue,
    ) -> Result<(), StoreError> {
        if !value.same_shape(&self.default) {
            return Err(StoreError::Corrupted);
        }
        match &mut self.backing {
            Backing::Ram(v) => {
                *v = value.clone();
                Ok(())
            }
            Backing::Persistent { offset } => {
                let mut buf = [0u8; MAX_SLOT_WIDTH];
                let bytes = &mut buf[..value.encoded_len()];
                value.encode(bytes);
                store.write_at(*offset, bytes).inspect_err(|e| {
                    warn!("Store: write at {} failed: {}", *offset, e);
                })
            }
        }
    }
}

/// Widest possible encoding: an array of 8-byte elements or a full string.
const MAX_SLOT_WIDTH: usize = {
    let arrays = crate::config::ARRAY_LENGTH_MAX * 8;
    let text = crate::config::STRING_CAPACITY_MAX;
    if arrays > text { arrays } else { text }
};

impl FieldValue {
    fn decode_like_store(&self, store: &dyn ByteStore, offset: usize) -> Result<Self, StoreError> {
        let mut buf = [0u8; MAX_SLOT_WIDTH];
        let bytes = &mut buf[..self.encoded_len()];
        store.read_at(offset, bytes)?;
        self.decode_like(bytes)
    }
}
