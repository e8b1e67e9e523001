//! `?` / `??` in all their forms, and the listing built-ins.

use serde_json::json;

use crate::mock_device::MockDevice;

#[test]
fn help_lists_user_methods() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["?"]"#);
    let result = &reply["result"];
    assert_eq!(result["device_info"]["name"], json!("mock_device"));
    assert_eq!(
        result["methods"],
        json!(["setCount", "getCount", "sum", "fail", "unbound"])
    );
    assert!(result.get("parameters").is_none());
}

#[test]
fn verbose_help_expands_methods_and_parameters() {
    let mut dev = MockDevice::new();
    let result = dev.call("??")["result"].clone();
    let set_count = &result["methods"][0];
    assert_eq!(set_count["name"], json!("setCount"));
    assert_eq!(set_count["parameters"], json!(["count"]));
    assert_eq!(set_count["result_type"], json!("long"));
    let names: Vec<&str> = result["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"count"));
    assert!(names.contains(&"count_value"));
}

#[test]
fn method_help_does_not_invoke_the_callback() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["setCount", "?"]"#);
    assert_eq!(
        reply["result"]["method_info"],
        json!({"name": "setCount", "parameters": ["count"], "result_type": "long"})
    );
    let verbose = dev.call(r#"["setCount", "??"]"#);
    assert_eq!(
        verbose["result"]["method_info"]["parameters"][0],
        json!({"name": "count", "type": "long", "min": 0, "max": 10})
    );
    assert_eq!(dev.calls.get(), 0);
}

#[test]
fn unary_method_help_includes_its_parameter() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["setCount", "?"]"#);
    let info = &reply["result"]["parameter_info"];
    assert_eq!(info["name"], json!("count"));
    assert_eq!(info["type"], json!("long"));
    assert_eq!(info["min"], json!(0));
    assert_eq!(info["max"], json!(10));

    let via_help = dev.call(r#"["?", "setCount"]"#);
    assert_eq!(via_help["result"], reply["result"]);

    let no_args = dev.call(r#"["getCount", "?"]"#);
    assert!(no_args["result"].get("parameter_info").is_none());
    assert_eq!(dev.calls.get(), 0);
}

#[test]
fn parameter_help_through_a_method() {
    let mut dev = MockDevice::new();
    let by_name = dev.call(r#"["setCount", "count", "?"]"#);
    assert_eq!(by_name["result"]["parameter_info"]["name"], json!("count"));
    let by_position = dev.call(r#"["setCount", 0, "?"]"#);
    assert_eq!(by_position["result"], by_name["result"]);
    let missing = dev.call(r#"["setCount", "values", "?"]"#);
    assert_eq!(missing["error"]["code"], json!(-32602));
    assert_eq!(missing["error"]["data"], json!("Parameter not found"));
    assert_eq!(dev.calls.get(), 0);
}

#[test]
fn help_method_with_targets() {
    let mut dev = MockDevice::new();
    let method = dev.call(r#"["?", "sum"]"#);
    assert_eq!(method["result"]["method_info"]["name"], json!("sum"));
    let by_id = dev.call(r#"["?", 10]"#);
    assert_eq!(by_id["result"], method["result"]);

    let parameter = dev.call(r#"["?", "label"]"#);
    assert_eq!(
        parameter["result"]["parameter_info"],
        json!({"name": "label", "units": "chars", "type": "string"})
    );

    let pair = dev.call(r#"["??", "sum", "values"]"#);
    assert_eq!(
        pair["result"]["parameter_info"],
        json!({
            "name": "values",
            "type": "array",
            "array_element_type": "long",
            "array_length_min": 1,
            "array_length_max": 3
        })
    );

    for line in [r#"["?", "nothing"]"#, r#"["?", "sum", "nothing"]"#, r#"["?", 1, 2, 3]"#] {
        let reply = dev.call(line);
        assert_eq!(reply["error"]["code"], json!(-32602), "{line}");
    }
}

#[test]
fn get_parameters_lists_every_schema() {
    let mut dev = MockDevice::new();
    let reply = dev.call(r#"["getParameters"]"#);
    let parameters = reply["result"]["parameters"].as_array().unwrap();
    assert!(parameters.iter().any(|p| p["name"] == json!("values")));
    let odd = parameters
        .iter()
        .find(|p| p["name"] == json!("odd_field"))
        .unwrap();
    assert_eq!(odd["subset"], json!([1, 3, 5, 7, 9]));
}

#[test]
fn field_listings() {
    let mut dev = MockDevice::new();
    let defaults = dev.call(r#"["getFieldDefaultValues"]"#)["result"].clone();
    assert_eq!(defaults["count_value"], json!(5));
    assert_eq!(defaults["long_array_field"], json!([5, 4, 3, 2]));
    assert_eq!(defaults["string_field"], json!("abc"));
    assert_eq!(defaults["mode_field"], json!("rising"));

    dev.call(r#"["setCount", 9]"#);
    dev.call(r#"["mode_field", "setValue", "change"]"#);
    let values = dev.call(r#"["getFieldValues"]"#)["result"].clone();
    assert_eq!(values["count_value"], json!(9));
    assert_eq!(values["mode_field"], json!("change"));

    let reset = dev.call(r#"["setFieldsToDefaults"]"#)["result"].clone();
    assert_eq!(reset, defaults);
}
