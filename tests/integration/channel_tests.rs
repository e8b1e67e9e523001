//! `poll()` over loopback and pipe channels: framing, rotation, overflow.

use embassy_sync::pipe::Pipe;
use modserver::adapters::loopback::loopback;
use modserver::adapters::pipe::{BytePipe, PipeTransport};
use modserver::config::REQUEST_LEN_MAX;
use modserver::server::RequestState;
use serde_json::{Value, json};

use crate::mock_device::MockDevice;

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[test]
fn one_request_per_poll() {
    let mut dev = MockDevice::new();
    let (transport, client) = loopback();
    dev.server.add_channel(transport).unwrap();

    client.send(b"[\"setCount\", 2]\n[\"getCount\"]\r\n");
    assert!(dev.server.poll());
    assert_eq!(parse(&client.take_output())["result"], json!(2));
    assert!(client.pending() > 0);
    assert!(dev.server.poll());
    assert_eq!(client.take_output(), "{\"id\":\"getCount\",\"result\":2}\n");
    assert!(!dev.server.poll());
}

#[test]
fn partial_lines_wait_for_the_terminator() {
    let mut dev = MockDevice::new();
    let (transport, client) = loopback();
    dev.server.add_channel(transport).unwrap();

    client.send(b"[\"getC");
    assert!(!dev.server.poll());
    client.send(b"ount\"]");
    assert!(!dev.server.poll());
    client.send(b"\n");
    assert!(dev.server.poll());
    assert_eq!(parse(&client.take_output())["result"], json!(5));
}

#[test]
fn blank_lines_are_skipped() {
    let mut dev = MockDevice::new();
    let (transport, client) = loopback();
    dev.server.add_channel(transport).unwrap();

    client.send(b"\n\r\n   \n[0]\n");
    assert!(dev.server.poll());
    assert_eq!(parse(&client.take_output())["id"], json!(0));
}

#[test]
fn channels_take_turns() {
    let mut dev = MockDevice::new();
    let (first, a) = loopback();
    let (second, b) = loopback();
    assert_eq!(dev.server.add_channel(first).unwrap(), 0);
    assert_eq!(dev.server.add_channel(second).unwrap(), 1);

    a.send_line(r#"["setCount", 1]"#);
    a.send_line(r#"["setCount", 3]"#);
    b.send_line(r#"["getCount"]"#);

    assert!(dev.server.poll());
    assert_eq!(parse(&a.take_output())["result"], json!(1));
    // Second channel is served before the first gets its next turn.
    assert!(dev.server.poll());
    assert_eq!(parse(&b.take_output())["result"], json!(1));
    assert!(dev.server.poll());
    assert_eq!(parse(&a.take_output())["result"], json!(3));
}

#[test]
fn idle_channel_does_not_block_the_rotation() {
    let mut dev = MockDevice::new();
    let (first, _a) = loopback();
    let (second, b) = loopback();
    dev.server.add_channel(first).unwrap();
    dev.server.add_channel(second).unwrap();

    b.send_line("[0]");
    assert!(!dev.server.poll());
    assert!(dev.server.poll());
    assert_eq!(parse(&b.take_output())["id"], json!(0));
}

#[test]
fn overlong_line_gets_one_error_and_is_dropped() {
    let mut dev = MockDevice::new();
    let (transport, client) = loopback();
    dev.server.add_channel(transport).unwrap();

    let long = format!("[\"{}\"]", "x".repeat(REQUEST_LEN_MAX + 10));
    client.send_line(&long);
    client.send_line("[0]");

    assert!(dev.server.poll());
    let reply = parse(&client.take_output());
    assert_eq!(reply["error"]["code"], json!(-32000));
    assert_eq!(reply["error"]["data"], json!("Request length too long."));
    assert_eq!(dev.server.last_state(), RequestState::ReadingRequest);

    // The tail of the long line is discarded; the next request is intact.
    assert!(dev.server.poll());
    assert_eq!(parse(&client.take_output())["id"], json!(0));
    assert_eq!(client.take_output(), "");
}

#[test]
fn full_length_line_is_served_with_crlf_or_lf() {
    let mut dev = MockDevice::new();
    let (transport, client) = loopback();
    dev.server.add_channel(transport).unwrap();

    let request = r#"["getCount"]"#;
    let line = format!("{request:<width$}", width = REQUEST_LEN_MAX);
    assert_eq!(line.len(), REQUEST_LEN_MAX);

    for terminator in ["\r\n", "\n"] {
        client.send(format!("{line}{terminator}").as_bytes());
        assert!(dev.server.poll());
        assert_eq!(parse(&client.take_output())["result"], json!(5));
    }
}

#[test]
fn closed_channel_is_logged_and_skipped() {
    let mut dev = MockDevice::new();
    let (broken, a) = loopback();
    let (healthy, b) = loopback();
    dev.server.add_channel(broken).unwrap();
    dev.server.add_channel(healthy).unwrap();

    a.send_line("[0]");
    a.close();
    b.send_line("[0]");
    assert!(dev.server.poll());
    assert_eq!(a.take_output(), "");
    assert!(dev.server.poll());
    assert_eq!(parse(&b.take_output())["id"], json!(0));
}

static INBOUND: BytePipe = Pipe::new();
static OUTBOUND: BytePipe = Pipe::new();

#[test]
fn pipe_channel_serves_requests() {
    let mut dev = MockDevice::new();
    dev.server
        .add_channel(PipeTransport::new(&INBOUND, &OUTBOUND))
        .unwrap();

    assert_eq!(INBOUND.try_write(b"[\"getMethodIds\"]\n").unwrap(), 17);
    assert!(dev.server.poll());

    let mut out = [0u8; 256];
    let n = OUTBOUND.try_read(&mut out).unwrap();
    let reply = parse(core::str::from_utf8(&out[..n]).unwrap());
    assert_eq!(reply["result"]["setCount"], json!(8));
}
