use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Channel;

/// Configuration for opening a serial channel.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Per-read poll timeout. Default: 10 ms.
    pub timeout: Duration,
    /// DTR level applied right after opening. Default: high (motor off).
    pub dtr_on_open: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10),
            dtr_on_open: true,
        }
    }
}

/// `serialport`-backed channel (8N1, no flow control).
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialChannel {
    /// Open `port` at `baud_rate` with default configuration.
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(port, baud_rate, &SerialConfig::default())
    }

    /// Open `port` at `baud_rate` with explicit configuration.
    pub fn open_with_config(port: &str, baud_rate: u32, config: &SerialConfig) -> Result<Self> {
        let mut handle = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;

        handle.write_data_terminal_ready(config.dtr_on_open)?;
        handle.clear(ClearBuffer::All)?;

        info!(port, baud_rate, "opened serial channel");

        Ok(Self {
            port: handle,
            name: port.to_string(),
        })
    }

    /// Configured baud rate as reported by the OS.
    pub fn baud_rate(&self) -> Result<u32> {
        Ok(self.port.baud_rate()?)
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Channel for SerialChannel {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout).map_err(Into::into)
    }

    fn clear_input(&mut self) -> Result<()> {
        debug!(port = %self.name, "clearing receive buffer");
        self.port.clear(ClearBuffer::Input).map_err(Into::into)
    }

    fn set_dtr(&mut self, level: bool) -> Result<()> {
        self.port
            .write_data_terminal_ready(level)
            .map_err(Into::into)
    }

    fn try_clone(&self) -> Result<Self> {
        let cloned = self.port.try_clone()?;
        Ok(Self {
            port: cloned,
            name: self.name.clone(),
        })
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("name", &self.name)
            .finish()
    }
}

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub kind: &'static str,
    pub usb_id: Option<(u16, u16)>,
    pub product: Option<String>,
}

/// Enumerate the serial ports present on this machine.
pub fn list_ports() -> Result<Vec<PortDescription>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| match info.port_type {
            SerialPortType::UsbPort(usb) => PortDescription {
                name: info.port_name,
                kind: "usb",
                usb_id: Some((usb.vid, usb.pid)),
                product: usb.product,
            },
            SerialPortType::PciPort => PortDescription {
                name: info.port_name,
                kind: "pci",
                usb_id: None,
                product: None,
            },
            SerialPortType::BluetoothPort => PortDescription {
                name: info.port_name,
                kind: "bluetooth",
                usb_id: None,
                product: None,
            },
            SerialPortType::Unknown => PortDescription {
                name: info.port_name,
                kind: "unknown",
                usb_id: None,
                product: None,
            },
        })
        .collect())
}
