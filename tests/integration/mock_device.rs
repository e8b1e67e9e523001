//! Test device built on a RAM store.
//!
//! Mirrors a small firmware: a `setCount`/`getCount` pair backed by a
//! persisted field, plus one field of every storable kind. Callback
//! invocations are counted so tests can assert a request never reached
//! user code.

use std::cell::Cell;
use std::rc::Rc;

use modserver::Server;
use modserver::adapters::memory_store::MemoryStore;
use modserver::config::DeviceConfig;
use modserver::schema::{SubsetMember, ValueType};
use modserver::storage::FieldValue;
use serde_json::Value;

pub const STORE_CAPACITY: usize = 512;
pub const COUNT_DEFAULT: i64 = 5;
pub const MODES: &[&str] = &["rising", "falling", "change"];

pub struct MockDevice {
    pub server: Server<MemoryStore>,
    /// User callback invocations so far.
    pub calls: Rc<Cell<usize>>,
}

#[allow(dead_code)]
impl MockDevice {
    /// A freshly erased store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(STORE_CAPACITY))
    }

    /// Boot on an existing store, as after a reset.
    pub fn with_store(store: MemoryStore) -> Self {
        let mut config = DeviceConfig::named("mock_device");
        config.model_number = 1234;
        config.serial_number_default = 77;
        let mut server = Server::new(config, store).unwrap();
        let calls = Rc::new(Cell::new(0));
        register(&mut server, &calls);
        server.start().unwrap();
        Self { server, calls }
    }

    /// Send one request line and parse the response.
    pub fn call(&mut self, line: &str) -> Value {
        let text = self.raw(line);
        serde_json::from_str(&text).unwrap()
    }

    /// Send one request line and return the response text.
    pub fn raw(&mut self, line: &str) -> String {
        let text = self.server.handle_line(line.as_bytes()).unwrap();
        assert!(text.ends_with('\n'), "response must be newline terminated");
        assert_eq!(text.matches('\n').count(), text.lines().count());
        text
    }

    /// Power-cycle: same store, fresh registry.
    pub fn reboot(self) -> Self {
        Self::with_store(self.server.into_store())
    }
}

fn register(server: &mut Server<MemoryStore>, calls: &Rc<Cell<usize>>) {
    // ── Fields ────────────────────────────────────────────────
    let count_field = server
        .create_field("count_value", FieldValue::Long(COUNT_DEFAULT))
        .unwrap();
    server
        .field_parameter_mut(count_field)
        .unwrap()
        .set_range(0, 10);
    server
        .create_field("double_field", FieldValue::Double(2.5))
        .unwrap();
    server
        .create_field("bool_field", FieldValue::Bool(false))
        .unwrap();
    let long_array = server
        .create_field(
            "long_array_field",
            FieldValue::long_array(&[5, 4, 3, 2]).unwrap(),
        )
        .unwrap();
    server
        .field_parameter_mut(long_array)
        .unwrap()
        .set_range(-3, 10);
    server
        .create_field(
            "bool_array_field",
            FieldValue::bool_array(&[false, true]).unwrap(),
        )
        .unwrap();
    server
        .create_field("string_field", FieldValue::text("abc", 10).unwrap())
        .unwrap();
    let odd = server.create_field("odd_field", FieldValue::Long(5)).unwrap();
    let odd_subset: Vec<SubsetMember> =
        [1i64, 3, 5, 7, 9].into_iter().map(SubsetMember::from).collect();
    server
        .field_parameter_mut(odd)
        .unwrap()
        .set_subset(&odd_subset)
        .unwrap();
    server
        .create_field("mode_field", FieldValue::choice("rising", MODES).unwrap())
        .unwrap();
    server
        .create_ram_field("scratch", FieldValue::Long(0))
        .unwrap();

    // ── Parameters ────────────────────────────────────────────
    let count = server.create_parameter("count").unwrap();
    server
        .parameter_mut(count)
        .unwrap()
        .set_type(ValueType::Long)
        .set_range(0, 10);
    let values = server.create_parameter("values").unwrap();
    server
        .parameter_mut(values)
        .unwrap()
        .set_array(ValueType::Long)
        .set_array_length_range(1, 3);
    let label = server.create_parameter("label").unwrap();
    server.parameter_mut(label).unwrap().set_type(ValueType::String).set_units("chars");

    // ── Methods ───────────────────────────────────────────────
    let set_count = server.create_method("setCount").unwrap();
    server
        .method_mut(set_count)
        .unwrap()
        .add_parameter(count)
        .unwrap()
        .set_result_type(ValueType::Long);
    let seen = Rc::clone(calls);
    server
        .attach_callback(set_count, move |req| {
            seen.set(seen.get() + 1);
            let n = req.long("count").unwrap_or_default();
            if req.field("count_value").is_some_and(|mut f| f.set(n)) {
                req.write_result(n);
            }
        })
        .unwrap();

    let get_count = server.create_method("getCount").unwrap();
    let seen = Rc::clone(calls);
    server
        .attach_callback(get_count, move |req| {
            seen.set(seen.get() + 1);
            let n = req.field("count_value").and_then(|f| f.long());
            req.write_result(n);
        })
        .unwrap();

    let sum = server.create_method("sum").unwrap();
    server
        .method_mut(sum)
        .unwrap()
        .add_parameter(values)
        .unwrap()
        .set_result_type(ValueType::Long);
    let seen = Rc::clone(calls);
    server
        .attach_callback(sum, move |req| {
            seen.set(seen.get() + 1);
            let total: i64 = req
                .array("values")
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_i64)
                .sum();
            req.write_result(total);
        })
        .unwrap();

    let fail = server.create_method("fail").unwrap();
    server
        .method_mut(fail)
        .unwrap()
        .add_parameter(label)
        .unwrap();
    let seen = Rc::clone(calls);
    server
        .attach_callback(fail, move |req| {
            seen.set(seen.get() + 1);
            let label = req.str("label").unwrap_or_default().to_owned();
            req.write_error(&label);
            // Refused: the error above was written first.
            req.write_result(1);
        })
        .unwrap();

    // Registered but never given a callback.
    server.create_method("unbound").unwrap();
}
