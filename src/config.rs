//! Server capacities and device identity.
//!
//! Every collection in the engine is sized by one of the constants below;
//! nothing grows past them at runtime. Device identity is reported by the
//! `getDeviceInfo` reserved method and the help listing.

use serde::{Deserialize, Serialize};

// ── Registry capacities ───────────────────────────────────────

/// Methods, including the reserved ones registered by the server itself.
pub const METHOD_COUNT_MAX: usize = 32;
/// Parameters, including one per field.
pub const PARAMETER_COUNT_MAX: usize = 48;
/// Fields (persisted or RAM-backed named values).
pub const FIELD_COUNT_MAX: usize = 24;
/// User callbacks attached to methods.
pub const HANDLER_COUNT_MAX: usize = METHOD_COUNT_MAX;
/// Positional parameters a single method may declare.
pub const METHOD_PARAMETER_COUNT_MAX: usize = 8;
/// Members of a parameter subset (allow-list).
pub const SUBSET_COUNT_MAX: usize = 8;

// ── Value capacities ──────────────────────────────────────────

/// Elements of an array-valued field.
pub const ARRAY_LENGTH_MAX: usize = 16;
/// Bytes of a char-array string field.
pub const STRING_CAPACITY_MAX: usize = 64;

// ── Request handling ──────────────────────────────────────────

/// Byte channels the server rotates over.
pub const CHANNEL_COUNT_MAX: usize = 4;
/// Longest request line, terminator excluded.
pub const REQUEST_LEN_MAX: usize = 256;
/// JSON values (every array element and object member counts) per request.
pub const JSON_TOKEN_MAX: usize = 32;
/// Longest `error.data` string.
pub const ERROR_DATA_LEN_MAX: usize = 128;

/// Device identity reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Human-readable device name.
    pub name: heapless::String<32>,
    pub model_number: u32,
    pub firmware_version: FirmwareVersion,
    /// Serial number written on first boot; later boots keep the persisted one.
    pub serial_number_default: u32,
}

/// Semantic firmware version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl DeviceConfig {
    /// Build a config with the given name; overlong names are truncated.
    pub fn named(name: &str) -> Self {
        let mut cfg = Self::default();
        cfg.name.clear();
        for ch in name.chars() {
            if cfg.name.push(ch).is_err() {
                break;
            }
        }
        cfg
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut name = heapless::String::new();
        let _ = name.push_str("modular_device"); // 14 of 32 bytes
        Self {
            name,
            model_number: 0,
            firmware_version: FirmwareVersion {
                major: 0,
                minor: 3,
                patch: 0,
            },
            serial_number_default: 0,
        }
    }
}
