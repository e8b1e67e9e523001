//! Fuzz target: `LineDecoder::push`
//!
//! Feeds arbitrary bytes one at a time and checks that every yielded line
//! fits the request buffer and carries no terminator.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use modserver::config::REQUEST_LEN_MAX;
use modserver::server::{LineDecoder, LineEvent};

fuzz_target!(|data: &[u8]| {
    let mut decoder = LineDecoder::new();
    for &byte in data {
        if let Some(LineEvent::Line(line)) = decoder.push(byte) {
            assert!(line.len() <= REQUEST_LEN_MAX);
            assert!(!line.contains(&b'\n'));
            assert_ne!(line.last(), Some(&b'\r'));
        }
    }

    decoder.reset();
    assert_eq!(decoder.pending(), 0);
});
