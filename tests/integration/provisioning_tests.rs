//! Sentinel-driven provisioning and persistence across reboots.

use modserver::adapters::memory_store::MemoryStore;
use modserver::config::DeviceConfig;
use modserver::storage::{FieldValue, INITIALIZED_MARKER};
use modserver::{Error, Server};
use serde_json::json;

use crate::mock_device::{COUNT_DEFAULT, MockDevice};

#[test]
fn first_boot_reads_defaults_and_later_boots_keep_writes() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.call(r#"["getCount"]"#)["result"], json!(COUNT_DEFAULT));
    assert_eq!(dev.call(r#"["setCount", 9]"#)["result"], json!(9));
    dev.call(r#"["long_array_field", "setElementValue", 0, -1]"#);
    dev.call(r#"["mode_field", "setValue", "falling"]"#);

    let mut dev = dev.reboot();
    assert_eq!(dev.call(r#"["getCount"]"#)["result"], json!(9));
    assert_eq!(dev.call(r#"["long_array_field"]"#)["result"], json!([-1, 4, 3, 2]));
    assert_eq!(dev.call(r#"["mode_field"]"#)["result"], json!("falling"));
}

#[test]
fn sentinel_sits_at_offset_zero() {
    let dev = MockDevice::new();
    let bytes = dev.server.store().as_bytes();
    assert_eq!(bytes[..8], INITIALIZED_MARKER.to_le_bytes());
}

#[test]
fn provisioning_is_idempotent() {
    let dev = MockDevice::new();
    let before = dev.server.store().as_bytes().to_vec();
    let writes = dev.server.store().write_count();

    let mut server = Server::new(DeviceConfig::default(), dev.server.into_store()).unwrap();
    server.create_field("count_value", FieldValue::Long(COUNT_DEFAULT)).unwrap();
    assert!(!server.start().unwrap());
    assert!(!server.start().unwrap());
    assert_eq!(server.store().as_bytes(), &before[..]);
    assert_eq!(server.store().write_count(), writes);
}

#[test]
fn erased_store_is_reprovisioned() {
    let dev = MockDevice::new();
    let mut store = dev.server.into_store();
    store.erase();
    let mut server = Server::new(DeviceConfig::default(), store).unwrap();
    server.create_field("count_value", FieldValue::Long(3)).unwrap();
    assert!(server.start().unwrap());
    assert_eq!(server.field("count_value").unwrap().long(), Some(3));
}

#[test]
fn serial_number_survives_reboot() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.server.serial_number(), 77);
    dev.server.set_serial_number(31337).unwrap();
    let mut dev = dev.reboot();
    assert_eq!(dev.call("[0]")["result"]["serial_number"], json!(31337));
}

#[test]
fn store_too_small_is_a_setup_error() {
    let mut server = Server::new(DeviceConfig::default(), MemoryStore::new(24)).unwrap();
    assert!(server.create_field("a", FieldValue::Long(1)).is_ok());
    assert_eq!(
        server.create_field("b", FieldValue::Long(1)),
        Err(Error::StoreFull {
            needed: 32,
            capacity: 24
        })
    );
    assert_eq!(server.storage_used(), 24);
}

#[test]
fn duplicate_names_are_refused() {
    let mut dev = MockDevice::new();
    assert_eq!(
        dev.server.create_method("setCount"),
        Err(Error::DuplicateName("setCount"))
    );
    assert_eq!(
        dev.server.create_parameter("count"),
        Err(Error::DuplicateName("count"))
    );
    assert!(dev.server.create_field("setCount", FieldValue::Long(0)).is_err());
    assert!(dev.server.create_field("count", FieldValue::Long(0)).is_err());
    let used = dev.server.storage_used();
    assert!(dev.server.create_field("count_value", FieldValue::Long(0)).is_err());
    assert_eq!(dev.server.storage_used(), used);
}
