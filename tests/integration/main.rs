//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises one part of the server end to end through
//! `handle_line` or `poll`, against a RAM store and loopback channels.
//! Everything runs on the host.

mod channel_tests;
mod dispatch_tests;
mod field_tests;
mod help_tests;
mod mock_device;
mod provisioning_tests;
