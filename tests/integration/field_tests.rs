//! Field-addressed requests and the field API seen from handlers.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use crate::mock_device::{COUNT_DEFAULT, MockDevice};

#[test]
fn get_and_set_scalar() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.call(r#"["count_value"]"#)["result"], json!(COUNT_DEFAULT));
    assert_eq!(dev.call(r#"["count_value", "getValue"]"#)["result"], json!(COUNT_DEFAULT));
    assert_eq!(dev.call(r#"["count_value", "setValue", 8]"#)["result"], json!(8));
    assert_eq!(
        dev.call(r#"["count_value", "getDefaultValue"]"#)["result"],
        json!(COUNT_DEFAULT)
    );
    assert_eq!(
        dev.call(r#"["count_value", "setValueToDefault"]"#)["result"],
        json!(COUNT_DEFAULT)
    );
}

#[test]
fn field_writes_are_validated() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["count_value", "setValue", 11]"#);
    assert_eq!(reply["error"]["code"], json!(-32602));
    assert!(
        reply["error"]["data"]
            .as_str()
            .unwrap()
            .contains("0 <= count_value <= 10")
    );
    let wrong_type = dev.call(r#"["bool_field", "setValue", 1]"#);
    assert_eq!(wrong_type["error"]["data"], json!("bool_field must be bool"));
    let not_odd = dev.call(r#"["odd_field", "setValue", 4]"#);
    assert_eq!(
        not_odd["error"]["data"],
        json!("Parameter value not in subset: odd_field")
    );
    let not_mode = dev.call(r#"["mode_field", "setValue", "sideways"]"#);
    assert_eq!(not_mode["error"]["code"], json!(-32602));
    assert_eq!(dev.call(r#"["count_value"]"#)["result"], json!(COUNT_DEFAULT));
}

#[test]
fn array_elements() {
    let mut dev = MockDevice::new();
    let field = r#""long_array_field""#;
    assert_eq!(
        dev.call(&format!("[{field}, \"getElementValue\", 1]"))["result"],
        json!(4)
    );
    assert_eq!(
        dev.call(&format!("[{field}, \"setElementValue\", 1, -2]"))["result"],
        json!([5, -2, 3, 2])
    );
    assert_eq!(
        dev.call(&format!("[{field}, \"getDefaultElementValue\", 1]"))["result"],
        json!(4)
    );
    assert_eq!(
        dev.call(&format!("[{field}, \"setElementValueToDefault\", 1]"))["result"],
        json!([5, 4, 3, 2])
    );
    assert_eq!(
        dev.call(&format!("[{field}, \"setAllElementValues\", 7]"))["result"],
        json!([7, 7, 7, 7])
    );
}

#[test]
fn element_errors() {
    let mut dev = MockDevice::new();
    let out_of_range = dev.call(r#"["long_array_field", "setElementValue", 4, 1]"#);
    assert_eq!(
        out_of_range["error"]["data"],
        json!("Element index out of range: long_array_field")
    );
    let negative = dev.call(r#"["long_array_field", "getElementValue", -1]"#);
    assert_eq!(
        negative["error"]["data"],
        json!("Element index out of range: long_array_field")
    );
    let not_index = dev.call(r#"["long_array_field", "getElementValue", "x"]"#);
    assert_eq!(not_index["error"]["data"], json!("index must be long"));
    let element_range = dev.call(r#"["long_array_field", "setElementValue", 0, 11]"#);
    assert_eq!(element_range["error"]["code"], json!(-32602));
    let scalar = dev.call(r#"["count_value", "setAllElementValues", 1]"#);
    assert_eq!(scalar["error"]["data"], json!("count_value has no settable elements"));
}

#[test]
fn bulk_array_write_is_all_or_nothing() {
    let mut dev = MockDevice::new();
    let rejected = dev.call(r#"["long_array_field", "setValue", [1, 2, 99]]"#);
    assert_eq!(rejected["error"]["code"], json!(-32602));
    assert_eq!(dev.call(r#"["long_array_field"]"#)["result"], json!([5, 4, 3, 2]));

    let too_long = dev.call(r#"["long_array_field", "setValue", [1, 2, 3, 4, 5]]"#);
    assert_eq!(too_long["error"]["code"], json!(-32602));

    let prefix = dev.call(r#"["long_array_field", "setValue", [0, 1]]"#);
    assert_eq!(prefix["result"], json!([0, 1, 3, 2]));
}

#[test]
fn string_field() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.call(r#"["string_field", "setValue", "hello"]"#)["result"], json!("hello"));
    let too_long = dev.call(r#"["string_field", "setValue", "far too long for it"]"#);
    assert_eq!(too_long["error"]["data"], json!("Value does not fit field: string_field"));
    assert_eq!(dev.call(r#"["string_field"]"#)["result"], json!("hello"));
}

#[test]
fn unknown_operation_and_arity() {
    let mut dev = MockDevice::new();
    let unknown = dev.call(r#"["count_value", "explode"]"#);
    assert_eq!(unknown["id"], json!("count_value"));
    assert_eq!(unknown["error"]["code"], json!(-32601));
    let arity = dev.call(r#"["count_value", "setValue"]"#);
    assert_eq!(
        arity["error"]["data"],
        json!("Incorrect parameter number. 0 given. 1 needed.")
    );
}

#[test]
fn field_help() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["long_array_field", "?"]"#);
    assert_eq!(
        reply["result"]["parameter_info"],
        json!({
            "name": "long_array_field",
            "type": "array",
            "array_element_type": "long",
            "min": -3,
            "max": 10,
            "array_length_min": 1,
            "array_length_max": 4
        })
    );
}

#[test]
fn ram_field_is_not_persisted() {
    let mut dev = MockDevice::new();
    assert_eq!(dev.call(r#"["scratch", "setValue", 3]"#)["result"], json!(3));
    let mut dev = dev.reboot();
    assert_eq!(dev.call(r#"["scratch"]"#)["result"], json!(0));
}

#[test]
fn hooks_fire_around_writes() {
    let mut dev = MockDevice::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let id = dev.server.registry().find_field_index("long_array_field").unwrap();
    let (pre, post, pre_el, post_el) = (
        Rc::clone(&log),
        Rc::clone(&log),
        Rc::clone(&log),
        Rc::clone(&log),
    );
    dev.server
        .field_mut(id)
        .unwrap()
        .set_pre_set_hook(move || pre.borrow_mut().push("pre".to_string()))
        .set_post_set_hook(move || post.borrow_mut().push("post".to_string()))
        .set_pre_set_element_hook(move |i| pre_el.borrow_mut().push(format!("pre{i}")))
        .set_post_set_element_hook(move |i| post_el.borrow_mut().push(format!("post{i}")));

    dev.call(r#"["long_array_field", "setValue", [1]]"#);
    dev.call(r#"["long_array_field", "setElementValue", 2, 0]"#);
    // Bad index: refused before any element hook.
    dev.call(r#"["long_array_field", "setElementValue", 9, 0]"#);
    assert_eq!(*log.borrow(), ["pre", "post", "pre2", "post2"]);

    log.borrow_mut().clear();
    assert!(dev.server.set_fields_to_defaults());
    assert_eq!(*log.borrow(), ["pre", "post"]);

    dev.server.field_mut(id).unwrap().remove_hooks();
    dev.call(r#"["long_array_field", "setValue", [2]]"#);
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn typed_access_from_the_server() {
    let mut dev = MockDevice::new();
    let mut field = dev.server.field("double_field").unwrap();
    assert_eq!(field.double(), Some(2.5));
    assert!(field.set(-1.25));
    assert_eq!(field.value_json().unwrap(), json!(-1.25));
    assert!(!field.is_default());
    assert!(field.set_value_to_default());
    assert!(field.is_default());
    assert!(dev.server.field("missing").is_none());
}
