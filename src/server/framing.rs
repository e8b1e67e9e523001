//! Newline line framing.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────────┬──────────┐
//! │ request text (≤ REQUEST_LEN) │ \n (\r\n)│
//! └──────────────────────────────┴──────────┘
//! ```
//!
//! The decoder takes one byte at a time and yields a complete line when
//! the terminator arrives, so partial reads and several lines in one read
//! both work. A line that outgrows the buffer is reported once as
//! [`LineEvent::Overflow`] and the rest of it is dropped up to the next
//! newline.

use heapless::Vec;

use crate::config::REQUEST_LEN_MAX;

#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// A complete line, terminator and trailing `\r` removed.
    Line(&'a [u8]),
    /// The current line exceeded [`REQUEST_LEN_MAX`].
    Overflow,
}

pub struct LineDecoder {
    buf: Vec<u8, REQUEST_LEN_MAX>,
    /// The buffer holds a line handed out by the previous `push`.
    ready: bool,
    /// Dropping bytes until the next newline.
    discarding: bool,
    /// A `\r` held back until the next byte shows whether it ends the line.
    cr: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            ready: false,
            discarding: false,
            cr: false,
        }
    }

    /// Feed one byte.
    ///
    /// The returned line borrows the decoder and is valid until the next
    /// call to `push`.
    pub fn push(&mut self, byte: u8) -> Option<LineEvent<'_>> {
        if self.ready {
            self.buf.clear();
            self.ready = false;
        }

        if byte == b'\n' {
            self.cr = false;
            if self.discarding {
                self.discarding = false;
                return None;
            }
            self.ready = true;
            return Some(LineEvent::Line(&self.buf));
        }

        if self.discarding {
            return None;
        }
        // A held `\r` not followed by `\n` belongs to the line.
        if core::mem::take(&mut self.cr) && self.buf.push(b'\r').is_err() {
            return Some(self.overflow());
        }
        if byte == b'\r' {
            self.cr = true;
            return None;
        }
        if self.buf.push(byte).is_err() {
            return Some(self.overflow());
        }
        None
    }

    fn overflow(&mut self) -> LineEvent<'static> {
        self.buf.clear();
        self.discarding = true;
        LineEvent::Overflow
    }

    /// Bytes of the line in progress.
    pub fn pending(&self) -> usize {
        if self.ready { 0 } else { self.buf.len() + usize::from(self.cr) }
    }

    /// Drop any partial line (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.ready = false;
        self.discarding = false;
        self.cr = false;
    }
}
