//! [`Transport`] over a pair of `embassy-sync` byte pipes.
//!
//! Bridges a producer running elsewhere (a BLE stack callback, a USB task,
//! a UART ISR) into the server's polling loop without heap allocation:
//!
//! ```text
//! ┌──────────────┐  bytes   ┌──────────────┐
//! │ Producer task│─────────▶│ Server::poll │
//! │ (ISR / BLE)  │◀─────────│ (main loop)  │
//! └──────────────┘ replies  └──────────────┘
//! ```
//!
//! Both directions are non-blocking: a full outbound pipe reports a short
//! write and the server's `write_all` surfaces [`TransportError::Full`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;

use crate::ports::{Transport, TransportError};

/// Default pipe depth in bytes.
pub const PIPE_DEPTH: usize = 512;

/// Pipe type shared between the producer and the server.
pub type BytePipe<const N: usize = PIPE_DEPTH> = Pipe<CriticalSectionRawMutex, N>;

/// Server-side view of an inbound/outbound pipe pair.
pub struct PipeTransport<'a, const N: usize = PIPE_DEPTH> {
    inbound: &'a BytePipe<N>,
    outbound: &'a BytePipe<N>,
}

impl<'a, const N: usize> PipeTransport<'a, N> {
    pub fn new(inbound: &'a BytePipe<N>, outbound: &'a BytePipe<N>) -> Self {
        Self { inbound, outbound }
    }
}

impl<const N: usize> Transport for PipeTransport<'_, N> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        // An empty pipe is "no data yet", not an error.
        Ok(self.inbound.try_read(buf).unwrap_or(0))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if data.is_empty() {
            return Ok(0);
        }
        Ok(self.outbound.try_write(data).unwrap_or(0))
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.inbound.is_empty()
    }
}
