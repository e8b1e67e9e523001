//! Fuzz target: `Server::handle_line`
//!
//! Any request line must produce either nothing (blank) or exactly one
//! newline-terminated JSON object holding `result` or `error`.
//!
//! cargo fuzz run fuzz_handle_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use modserver::Server;
use modserver::adapters::memory_store::MemoryStore;
use modserver::config::DeviceConfig;
use modserver::schema::ValueType;
use modserver::storage::FieldValue;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(mut server) = Server::new(DeviceConfig::default(), MemoryStore::new(128)) else {
        return;
    };
    if let Ok(p) = server.create_parameter("count") {
        if let Some(param) = server.parameter_mut(p) {
            param.set_type(ValueType::Long).set_range(0, 10);
        }
        if let Ok(m) = server.create_method("setCount") {
            let _ = server.method_mut(m).map(|m| m.add_parameter(p));
            let _ = server.attach_callback(m, |req| {
                let n = req.long("count");
                req.write_result(n);
            });
        }
    }
    let _ = server.create_field("levels", FieldValue::Long(3));
    let _ = server.start();

    if let Some(text) = server.handle_line(data) {
        assert!(text.ends_with('\n'));
        let reply: Value = serde_json::from_str(&text).expect("response is JSON");
        let obj = reply.as_object().expect("response is an object");
        assert!(obj.contains_key("result") != obj.contains_key("error"));
    }
});
