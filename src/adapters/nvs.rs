//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ByteStore`] on top of a single ESP-IDF NVS blob. A RAM
//! mirror of the whole image serves reads; every write patches the mirror
//! and commits the blob, so the server sees EEPROM-like byte addressing.
//!
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`. A
//!   failed commit rolls the mirror back so it never diverges from flash.
//! - Off target the same type runs as a simulation backend with no
//!   persistence beyond the process.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::ports::{ByteStore, StoreError, check_range};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// NVS namespace holding the image.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const NAMESPACE: &[u8] = b"modserver\0";
/// Blob key within the namespace.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const IMAGE_KEY: &[u8] = b"eeprom\0";

/// Largest blob NVS will store in one entry on the default partition.
pub const MAX_IMAGE_SIZE: usize = 4000;

const ERASED: u8 = 0xFF;

pub struct NvsStore {
    image: Vec<u8>,
}

impl NvsStore {
    /// Open (or create) an image of `capacity` bytes.
    ///
    /// On target, a stored image of a different size is truncated or
    /// padded with erased bytes; layout growth therefore keeps existing
    /// offsets intact.
    pub fn new(capacity: usize) -> Result<Self, StoreError> {
        if capacity > MAX_IMAGE_SIZE {
            return Err(StoreError::OutOfBounds);
        }
        #[cfg_attr(not(target_os = "espidf"), allow(unused_mut))]
        let mut image = vec![ERASED; capacity];

        #[cfg(target_os = "espidf")]
        {
            init_flash()?;
            match load_image(&mut image) {
                Ok(len) => info!("NvsStore: loaded {} byte image", len),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => info!("NvsStore: no image, starting erased"),
                Err(e) => {
                    warn!("NvsStore: read error {}", e);
                    return Err(StoreError::IoError);
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsStore: simulation backend ({} bytes)", capacity);

        Ok(Self { image })
    }

    #[cfg(target_os = "espidf")]
    fn persist(&self) -> Result<(), StoreError> {
        with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    IMAGE_KEY.as_ptr() as *const _,
                    self.image.as_ptr() as *const _,
                    self.image.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NvsStore: commit failed {}", e);
            StoreError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn persist(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ByteStore for NvsStore {
    fn capacity(&self) -> usize {
        self.image.len()
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        check_range(offset, buf.len(), self.image.len())?;
        buf.copy_from_slice(&self.image[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError> {
        check_range(offset, data.len(), self.image.len())?;
        let range = offset..offset + data.len();
        if self.image[range.clone()] == *data {
            return Ok(());
        }
        let previous: Vec<u8> = self.image[range.clone()].to_vec();
        self.image[range.clone()].copy_from_slice(data);
        if let Err(e) = self.persist() {
            self.image[range].copy_from_slice(&previous);
            return Err(e);
        }
        Ok(())
    }
}

// ── ESP-IDF plumbing ──────────────────────────────────────────

/// Initialise NVS flash, erasing it when the partition layout changed.
#[cfg(target_os = "espidf")]
fn init_flash() -> Result<(), StoreError> {
    // SAFETY: called from the single main-task context before any other
    // NVS access.
    let ret = unsafe { nvs_flash_init() };
    if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
        warn!("NvsStore: erasing and re-initialising flash partition");
        if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
            return Err(StoreError::IoError);
        }
    } else if ret != ESP_OK {
        return Err(StoreError::IoError);
    }
    Ok(())
}

/// Copy the stored blob into `image`, returning the stored length.
#[cfg(target_os = "espidf")]
fn load_image(image: &mut [u8]) -> Result<usize, i32> {
    with_nvs_handle(false, |handle| {
        let mut size: usize = 0;
        let ret = unsafe {
            nvs_get_blob(
                handle,
                IMAGE_KEY.as_ptr() as *const _,
                core::ptr::null_mut(),
                &mut size,
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        let mut stored = vec![0u8; size];
        let ret = unsafe {
            nvs_get_blob(
                handle,
                IMAGE_KEY.as_ptr() as *const _,
                stored.as_mut_ptr() as *mut _,
                &mut size,
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        let len = size.min(image.len());
        image[..len].copy_from_slice(&stored[..len]);
        Ok(size)
    })
}

/// Open the image namespace, run `f` with the handle, then close.
#[cfg(target_os = "espidf")]
fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
where
    F: FnOnce(nvs_handle_t) -> Result<T, i32>,
{
    let mut handle: nvs_handle_t = 0;
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };
    let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
    if ret != ESP_OK {
        return Err(ret);
    }
    let result = f(handle);
    unsafe {
        nvs_close(handle);
    }
    result
}
