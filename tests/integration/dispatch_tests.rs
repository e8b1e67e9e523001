//! Request parsing, method resolution, validation and response shape.

use modserver::server::RequestState;
use serde_json::{Value, json};

use crate::mock_device::MockDevice;

fn has_exactly_one_outcome(reply: &Value) -> bool {
    let obj = reply.as_object().unwrap();
    obj.contains_key("result") != obj.contains_key("error")
}

#[test]
fn zero_resolves_to_device_info() {
    let mut dev = MockDevice::new();
    for line in [r#"["0"]"#, "[0]", "0"] {
        let reply = dev.call(line);
        assert_eq!(reply["id"], json!(0), "{line}");
        assert_eq!(reply["result"]["name"], json!("mock_device"));
        assert_eq!(reply["result"]["model_number"], json!(1234));
        assert_eq!(reply["result"]["serial_number"], json!(77));
    }
}

#[test]
fn device_info_key_order() {
    let mut dev = MockDevice::new();
    let text = dev.raw(r#"["getDeviceInfo"]"#);
    assert_eq!(
        text,
        "{\"id\":\"getDeviceInfo\",\"result\":{\"name\":\"mock_device\",\"model_number\":1234,\
         \"serial_number\":77,\"firmware_version\":{\"major\":0,\"minor\":3,\"patch\":0}}}\n"
    );
}

#[test]
fn out_of_range_argument_is_rejected_before_the_callback() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["setCount", 15]"#);
    assert_eq!(reply["id"], json!("setCount"));
    assert_eq!(reply["error"]["code"], json!(-32602));
    assert_eq!(reply["error"]["message"], json!("Invalid params"));
    let data = reply["error"]["data"].as_str().unwrap();
    assert!(data.contains("0 <= count <= 10"), "{data}");
    assert!(reply.get("result").is_none());
    assert_eq!(dev.calls.get(), 0);
    assert_eq!(dev.server.last_state(), RequestState::Resolved);
}

#[test]
fn valid_call_runs_the_callback() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["setCount", 7]"#);
    assert_eq!(reply, json!({"id": "setCount", "result": 7}));
    assert_eq!(dev.call(r#"["getCount"]"#)["result"], json!(7));
    assert_eq!(dev.calls.get(), 2);
    assert_eq!(dev.server.last_state(), RequestState::Dispatched);
}

#[test]
fn unknown_method_is_not_found() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["bogusMethod"]"#);
    assert_eq!(reply["id"], json!("bogusMethod"));
    assert_eq!(reply["error"]["code"], json!(-32601));
    assert_eq!(reply["error"]["message"], json!("Method not found"));
    assert!(reply.get("result").is_none());
    assert_eq!(dev.server.last_state(), RequestState::Parsed);

    let reply = dev.call("[999]");
    assert_eq!(reply["id"], json!(999));
    assert_eq!(reply["error"]["code"], json!(-32601));
}

#[test]
fn names_are_case_sensitive() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.call(r#"["setcount", 1]"#)["error"]["code"], json!(-32601));
}

#[test]
fn positional_ids_follow_registration_order() {
    let mut dev = MockDevice::new();
    let ids = dev.call(r#"["getMethodIds"]"#)["result"].clone();
    assert_eq!(ids["setCount"], json!(8));
    assert_eq!(ids["getCount"], json!(9));
    assert!(ids.get("getDeviceInfo").is_none());
    assert_eq!(dev.call("[8, 3]")["result"], json!(3));
    assert_eq!(dev.call(r#"["9"]"#)["result"], json!(3));
}

#[test]
fn wrong_argument_count() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["setCount", 1, 2]"#);
    assert_eq!(
        reply["error"]["data"],
        json!("Incorrect parameter number. 2 given. 1 needed.")
    );
    assert_eq!(dev.calls.get(), 0);
}

#[test]
fn array_arguments_are_checked() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.call(r#"["sum", [1, 2, 3]]"#)["result"], json!(6));
    let too_long = dev.call(r#"["sum", [1, 2, 3, 4]]"#);
    assert_eq!(too_long["error"]["code"], json!(-32602));
    let not_array = dev.call(r#"["sum", 4]"#);
    assert_eq!(
        not_array["error"]["data"],
        json!("values is not a valid JSON array")
    );
    let wrong_element = dev.call(r#"["sum", [1, "x"]]"#);
    assert_eq!(wrong_element["error"]["code"], json!(-32602));
}

#[test]
fn handler_error_wins_over_later_result() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["fail", "broken"]"#);
    assert_eq!(reply["error"]["code"], json!(-32000));
    assert_eq!(reply["error"]["data"], json!("broken"));
    assert!(reply.get("result").is_none());
}

#[test]
fn method_without_callback_answers_null() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.raw(r#"["unbound"]"#), "{\"id\":\"unbound\",\"result\":null}\n");
    assert_eq!(dev.call(r#"["unbound", 1]"#)["error"]["code"], json!(-32602));
}

#[test]
fn object_requests_are_refused() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"{"method": "getDeviceInfo"}"#);
    assert_eq!(reply["error"]["code"], json!(-32000));
    assert_eq!(
        reply["error"]["data"],
        json!("Object requests not supported. Must use array format.")
    );
    assert!(reply.get("id").is_none());
}

#[test]
fn malformed_json_is_a_parse_error() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["setCount", "#);
    assert_eq!(reply["error"]["code"], json!(-32700));
    assert_eq!(reply["error"]["message"], json!("Parse error"));
    assert_eq!(reply["error"]["data"], json!(r#"["setCount","#));
    assert_eq!(dev.server.last_state(), RequestState::ReadingRequest);
}

#[test]
fn empty_array_has_no_method() {
    let mut dev = MockDevice::new();
    let reply = dev.call("[]");
    assert_eq!(reply["error"]["code"], json!(-32601));
    assert!(reply.get("id").is_none());
}

#[test]
fn bare_text_is_wrapped_and_pretty_printed() {
    let mut dev = MockDevice::new();
    let text = dev.raw("setCount 4");
    assert!(text.lines().count() > 1);
    let reply: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reply["result"], json!(4));

    let compact = dev.raw(r#"["setCount", 4]"#);
    assert_eq!(compact.lines().count(), 1);
}

#[test]
fn identical_requests_give_identical_bytes() {
    let mut dev = MockDevice::new();
    for line in [r#"["??"]"#, r#"["getFieldValues"]"#, r#"["bogus"]"#, "sum [1,2]"] {
        let first = dev.raw(line);
        let second = dev.raw(line);
        assert_eq!(first, second, "{line}");
    }
}

#[test]
fn every_response_has_one_outcome() {
    let mut dev = MockDevice::new();
    let lines = [
        "[0]",
        r#"["setCount", 3]"#,
        r#"["setCount", 30]"#,
        r#"["fail", "x"]"#,
        r#"["nope"]"#,
        r#"{"a": 1}"#,
        "[1,",
        r#"["count_value", "setValue", 2]"#,
        r#"["count_value", "explode"]"#,
        r#"["?", "setCount"]"#,
    ];
    for line in lines {
        let reply = dev.call(line);
        assert!(has_exactly_one_outcome(&reply), "{line}: {reply}");
    }
}

#[test]
fn reserved_methods_ignore_extra_arguments() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["getMethodIds", 1, 2]"#);
    assert!(reply["result"].is_object());
}
