//! Blocking serial link abstraction.
//!
//! The parcel tracker speaks its packet protocol over a plain UART (usually a
//! Bluetooth serial bridge at 9600 baud). This crate is the lowest layer of
//! parcelwire: it opens and configures the port and hands out a
//! [`SerialStream`] that implements `Read + Write`.
//!
//! A stream can be cloned into independent halves so one thread owns all reads
//! while another owns all writes.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialConfig, SerialLink, DEFAULT_BAUD_RATE};
pub use traits::SerialStream;
