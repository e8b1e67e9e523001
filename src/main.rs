//! String controller: a demo device served over the UART console.
//!
//! ```text
//!   UART0 ──▶ Server ──▶ echo / length / startsWith / repeat / charsAt
//!               │        startingChars / setStoredString / getStoredString
//!               └──▶ NvsStore (fields survive reboot)
//! ```
//!
//! Try `?`, `??`, `["echo", "hello", false]` or `startingChars abcdef` on a
//! serial terminal.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use log::info;
use serde_json::Value;

use modserver::Request;
use modserver::Server;
use modserver::adapters::nvs::NvsStore;
use modserver::adapters::uart::UartTransport;
use modserver::config::{DeviceConfig, FirmwareVersion};
use modserver::registry::ParameterId;
use modserver::schema::{Parameter, ValueType};
use modserver::storage::FieldValue;

const STORE_CAPACITY: usize = 512;
const STORED_STRING_CAPACITY: usize = 32;
const STARTING_CHARS_COUNT: &str = "starting_chars_count";
const STORED_STRING: &str = "stored_string";

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("modserver string_controller v{}", env!("CARGO_PKG_VERSION"));

    let mut config = DeviceConfig::named("string_controller");
    config.model_number = 1002;
    config.firmware_version = FirmwareVersion {
        major: 0,
        minor: 3,
        patch: 0,
    };

    let store = NvsStore::new(STORE_CAPACITY)?;
    let mut server = Server::new(config, store)?;
    register(&mut server)?;
    server.add_channel(UartTransport::new(0)?)?;

    if server.start()? {
        info!("First boot: fields set to defaults");
    }

    loop {
        if !server.poll() {
            FreeRtos::delay_ms(5);
        }
    }
}

fn register(server: &mut Server<NvsStore>) -> Result<()> {
    // ── Fields ────────────────────────────────────────────────
    let starting = server.create_field(STARTING_CHARS_COUNT, FieldValue::Long(2))?;
    if let Some(p) = server.field_parameter_mut(starting) {
        p.set_range(1, 10);
    }
    server.create_field(
        STORED_STRING,
        FieldValue::text("I am a stored string.", STORED_STRING_CAPACITY)?,
    )?;

    // ── Parameters ────────────────────────────────────────────
    let string = parameter(server, "string", |p| {
        p.set_type(ValueType::String);
    })?;
    let string2 = parameter(server, "string2", |p| {
        p.set_type(ValueType::String);
    })?;
    let count = parameter(server, "count", |p| {
        p.set_type(ValueType::Long).set_range(1, 100);
    })?;
    let index_array = parameter(server, "index_array", |p| {
        p.set_array(ValueType::Long)
            .set_range(0, 9)
            .set_array_length_range(1, 10);
    })?;
    let double_echo = parameter(server, "double_echo", |p| {
        p.set_type(ValueType::Bool);
    })?;

    // ── Methods ───────────────────────────────────────────────
    method(server, "echo", &[string, double_echo], ValueType::String, |req| {
        let s = req.str("string").unwrap_or_default();
        let out = if req.bool("double_echo").unwrap_or(false) {
            format!("{s}{s}")
        } else {
            s.to_owned()
        };
        req.write_result(out);
    })?;

    method(server, "length", &[string], ValueType::Long, |req| {
        let n = req.str("string").map_or(0, |s| s.chars().count());
        req.write_result(n);
    })?;

    method(server, "startsWith", &[string, string2], ValueType::Bool, |req| {
        let s = req.str("string").unwrap_or_default();
        let prefix = req.str("string2").unwrap_or_default();
        let starts = s.starts_with(prefix);
        req.write_result(starts);
    })?;

    method(server, "repeat", &[string, count], ValueType::Array, |req| {
        let s = req.str("string").unwrap_or_default();
        let n = req.long("count").unwrap_or(0);
        let out: Vec<Value> = (0..n).map(|_| Value::from(s)).collect();
        req.write_result(out);
    })?;

    method(server, "charsAt", &[string, index_array], ValueType::Array, |req| {
        let chars: Vec<char> = req.str("string").unwrap_or_default().chars().collect();
        let indexes: Vec<u64> = req
            .array("index_array")
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_u64)
            .collect();
        let mut out = Vec::with_capacity(indexes.len());
        for index in indexes {
            let Some(c) = chars.get(index as usize) else {
                req.write_error("Index out of range");
                return;
            };
            out.push(serde_json::json!({ "index": index, "char": c.to_string() }));
        }
        req.write_result(out);
    })?;

    method(server, "startingChars", &[string], ValueType::String, |req| {
        let s = req.str("string").unwrap_or_default().to_owned();
        let n = req
            .field(STARTING_CHARS_COUNT)
            .and_then(|f| f.long())
            .unwrap_or(0);
        let head: String = s.chars().take(n as usize).collect();
        req.write_result(head);
    })?;

    method(server, "setStoredString", &[string], ValueType::Null, |req| {
        let s = req.str("string").unwrap_or_default().to_owned();
        let stored = req.field(STORED_STRING).is_some_and(|mut f| f.set(s));
        if !stored {
            req.write_error("String too long to store");
        }
    })?;

    method(server, "getStoredString", &[], ValueType::String, |req| {
        let text = req.field(STORED_STRING).and_then(|f| f.text());
        req.write_result(text.as_deref().unwrap_or_default());
    })?;

    Ok(())
}

fn parameter(
    server: &mut Server<NvsStore>,
    name: &'static str,
    shape: impl FnOnce(&mut Parameter),
) -> Result<ParameterId> {
    let id = server.create_parameter(name)?;
    if let Some(p) = server.parameter_mut(id) {
        shape(p);
    }
    Ok(id)
}

fn method(
    server: &mut Server<NvsStore>,
    name: &'static str,
    parameters: &[ParameterId],
    result_type: ValueType,
    callback: impl FnMut(&mut Request<'_>) + 'static,
) -> Result<()> {
    let id = server.create_method(name)?;
    if let Some(m) = server.method_mut(id) {
        for &p in parameters {
            m.add_parameter(p)?;
        }
        m.set_result_type(result_type);
    }
    server.attach_callback(id, callback)?;
    Ok(())
}
