//! [`Transport`] over an ESP-IDF UART port (target only).
//!
//! Installs the IDF UART driver with RX/TX ring buffers and then polls it
//! without blocking: `available` asks the driver for buffered bytes, `read`
//! drains what is there with a zero tick timeout.

use log::{info, warn};

use esp_idf_svc::sys::*;

use crate::ports::{Transport, TransportError};

const RX_BUFFER: i32 = 1024;
const TX_BUFFER: i32 = 1024;

pub struct UartTransport {
    port: uart_port_t,
}

impl UartTransport {
    /// Take over `port`, installing the driver unless the console already
    /// did.
    pub fn new(port: uart_port_t) -> Result<Self, TransportError> {
        // SAFETY: driver install/query are called once from the main task.
        let installed = unsafe { uart_is_driver_installed(port) };
        if !installed {
            let ret = unsafe {
                uart_driver_install(port, RX_BUFFER, TX_BUFFER, 0, core::ptr::null_mut(), 0)
            };
            if ret != ESP_OK {
                warn!("UART{}: driver install failed ({})", port, ret);
                return Err(TransportError::IoError);
            }
        }
        info!("UART{}: transport ready", port);
        Ok(Self { port })
    }
}

impl Transport for UartTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = unsafe { uart_read_bytes(self.port, buf.as_mut_ptr() as *mut _, buf.len() as _, 0) };
        if n < 0 {
            return Err(TransportError::IoError);
        }
        Ok(n as usize)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let n = unsafe { uart_write_bytes(self.port, data.as_ptr() as *const _, data.len() as _) };
        if n < 0 {
            return Err(TransportError::IoError);
        }
        Ok(n as usize)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        // 100 ticks is plenty for one response line at 115200 baud.
        let ret = unsafe { uart_wait_tx_done(self.port, 100) };
        if ret != ESP_OK {
            return Err(TransportError::IoError);
        }
        Ok(())
    }

    fn available(&self) -> bool {
        let mut len: usize = 0;
        let ret = unsafe { uart_get_buffered_data_len(self.port, &mut len as *mut usize as *mut _) };
        ret == ESP_OK && len > 0
    }
}
