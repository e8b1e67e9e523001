//! Persistent storage layout and first-boot provisioning.
//!
//! ```text
//!   offset 0        8               16
//!   ┌───────────────┬───────────────┬──────────┬──────────┬───
//!   │ sentinel (8B) │ serial (8B)   │ field 0  │ field 1  │ …
//!   └───────────────┴───────────────┴──────────┴──────────┴───
//! ```
//!
//! Offsets are handed out append-only in registration order and never
//! reused. On start, a sentinel that does not hold [`INITIALIZED_MARKER`]
//! means the store has never been provisioned: every persistent slot is
//! written with its default, then the sentinel is set.

mod slot;
mod value;

use log::info;

pub use slot::Slot;
pub use value::{BoundedString, ConstantChoice, Element, FieldValue};

use crate::error::{Error, Result};
use crate::ports::{ByteStore, StoreError};

/// Value the sentinel slot holds once the store is provisioned.
pub const INITIALIZED_MARKER: i64 = 0x4D53_5256_0000_0001;

/// Append-only offset allocator over a store of fixed capacity.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    next: usize,
    capacity: usize,
}

impl StorageLayout {
    pub fn new(capacity: usize) -> Self {
        Self { next: 0, capacity }
    }

    /// Bytes allocated so far.
    pub fn used(&self) -> usize {
        self.next
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserve `width` bytes and return their offset.
    pub fn allocate(&mut self, width: usize) -> Result<usize> {
        let needed = self.next + width;
        if needed > self.capacity {
            return Err(Error::StoreFull {
                needed,
                capacity: self.capacity,
            });
        }
        let offset = self.next;
        self.next = needed;
        Ok(offset)
    }

    /// Allocate and bind a persistent slot for `default`.
    pub fn persistent_slot(&mut self, default: FieldValue) -> Result<Slot> {
        let offset = self.allocate(default.encoded_len())?;
        Ok(Slot::persistent(default, offset))
    }
}

/// The sentinel slot. Must be the first allocation so it lands at offset 0.
pub fn sentinel_slot(layout: &mut StorageLayout) -> Result<Slot> {
    let slot = layout.persistent_slot(FieldValue::Long(INITIALIZED_MARKER))?;
    debug_assert_eq!(slot.offset(), Some(0));
    Ok(slot)
}

/// Write defaults into every slot if the sentinel is unset.
///
/// Returns `true` when provisioning ran. Running it again on the same store
/// is a no-op.
pub fn provision<'a>(
    store: &mut dyn ByteStore,
    sentinel: &mut Slot,
    slots: impl IntoIterator<Item = &'a mut Slot>,
) -> core::result::Result<bool, StoreError> {
    if sentinel.is_default(store) {
        return Ok(false);
    }
    info!("Store: sentinel absent, writing defaults");
    let mut written = 0usize;
    for slot in slots {
        if slot.is_persistent() {
            let default = slot.default_value().clone();
            slot.write(store, &default)?;
            written += 1;
        }
    }
    let marker = sentinel.default_value().clone();
    sentinel.write(store, &marker)?;
    info!("Store: provisioned {} slots", written);
    Ok(true)
}
