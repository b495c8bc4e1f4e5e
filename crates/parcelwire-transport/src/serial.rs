use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{SerialStream, BLOCKING_TIMEOUT};

/// Baud rate the tracker firmware configures its UART for.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// How to open a serial port.
///
/// The tracker uses 8 data bits, no parity, one stop bit and no flow control;
/// only the path, speed and timeout vary between setups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`, `COM21`, ...).
    pub path: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// I/O timeout. `None` means block until data arrives.
    pub timeout: Option<Duration>,
}

impl SerialConfig {
    /// Config for `path` at the default baud rate, blocking reads.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: None,
        }
    }

    /// Override the baud rate.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the I/O timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial port opener.
pub struct SerialLink;

impl SerialLink {
    /// Open and configure the port described by `config`.
    pub fn open(config: &SerialConfig) -> Result<SerialStream> {
        if let Some(t) = config.timeout {
            if t.is_zero() {
                return Err(TransportError::InvalidTimeout(t));
            }
        }

        debug!(path = %config.path, baud = config.baud_rate, "opening serial port");
        let port = serialport::new(config.path.as_str(), config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout.unwrap_or(BLOCKING_TIMEOUT))
            .open()
            .map_err(|source| TransportError::Open {
                path: config.path.clone(),
                source,
            })?;

        info!(path = %config.path, baud = config.baud_rate, "serial port open");
        Ok(SerialStream::from_port(port))
    }
}

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// `usb`, `pci`, `bluetooth` or `unknown`.
    pub kind: &'static str,
    /// USB product string when the driver reports one.
    pub product: Option<String>,
}

/// Enumerate serial ports.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let (kind, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => ("usb", usb.product),
                serialport::SerialPortType::PciPort => ("pci", None),
                serialport::SerialPortType::BluetoothPort => ("bluetooth", None),
                serialport::SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: p.port_name,
                kind,
                product,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(cfg.path, "/dev/ttyUSB0");
        assert_eq!(cfg.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(cfg.timeout, None);
    }

    #[test]
    fn config_builders() {
        let cfg = SerialConfig::new("COM21")
            .baud_rate(115_200)
            .timeout(Some(Duration::from_millis(250)));
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn open_rejects_zero_timeout() {
        let cfg = SerialConfig::new("/dev/null").timeout(Some(Duration::ZERO));
        let err = SerialLink::open(&cfg).unwrap_err();
        assert!(matches!(err, TransportError::InvalidTimeout(_)));
    }

    #[test]
    #[cfg(unix)]
    fn open_missing_device_fails() {
        let path = format!("/nonexistent/parcelwire-tty-{}", std::process::id());
        let err = SerialLink::open(&SerialConfig::new(path.clone())).unwrap_err();
        match err {
            TransportError::Open { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
