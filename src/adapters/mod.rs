//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements   | Connects to                      |
//! |----------------|--------------|----------------------------------|
//! | `memory_store` | ByteStore    | RAM (host builds, tests)         |
//! | `nvs`          | ByteStore    | ESP-IDF NVS blob / simulation    |
//! | `loopback`     | Transport    | In-process client handle         |
//! | `pipe`         | Transport    | `embassy-sync` byte pipes        |
//! | `uart`         | Transport    | ESP-IDF UART driver              |

pub mod loopback;
pub mod memory_store;
pub mod nvs;
pub mod pipe;
#[cfg(target_os = "espidf")]
pub mod uart;
