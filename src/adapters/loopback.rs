//! In-memory [`Transport`] with a shared handle for the client side.
//!
//! ```text
//!   LoopbackClient ──send()──▶ rx queue ──read()──▶ Server
//!   LoopbackClient ◀─take_output()── tx buffer ◀─write()── Server
//! ```
//!
//! Both halves share state through `Rc<RefCell<_>>`; everything runs on
//! one thread, same as the server.

use core::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::ports::{Transport, TransportError};

#[derive(Debug, Default)]
struct Shared {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    closed: bool,
}

/// Server-side half, handed to [`Server::add_channel`](crate::server::Server::add_channel).
pub struct LoopbackTransport {
    shared: Rc<RefCell<Shared>>,
}

/// Client-side half kept by the caller.
#[derive(Clone)]
pub struct LoopbackClient {
    shared: Rc<RefCell<Shared>>,
}

/// A connected transport/client pair.
pub fn loopback() -> (LoopbackTransport, LoopbackClient) {
    let shared = Rc::new(RefCell::new(Shared::default()));
    (
        LoopbackTransport {
            shared: Rc::clone(&shared),
        },
        LoopbackClient { shared },
    )
}

impl LoopbackClient {
    /// Queue raw bytes for the server.
    pub fn send(&self, bytes: &[u8]) {
        self.shared.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Queue one request line (terminator appended).
    pub fn send_line(&self, line: &str) {
        self.send(line.as_bytes());
        self.send(b"\n");
    }

    /// Drain everything the server wrote.
    pub fn take_output(&self) -> String {
        let bytes = core::mem::take(&mut self.shared.borrow_mut().tx);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Bytes queued but not yet read by the server.
    pub fn pending(&self) -> usize {
        self.shared.borrow().rx.len()
    }

    /// Make further server writes fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.shared.borrow_mut().closed = true;
    }
}

impl Transport for LoopbackTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut shared = self.shared.borrow_mut();
        let n = buf.len().min(shared.rx.len());
        for (dst, src) in buf.iter_mut().zip(shared.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut shared = self.shared.borrow_mut();
        if shared.closed {
            return Err(TransportError::Closed);
        }
        shared.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.shared.borrow().rx.is_empty()
    }
}
