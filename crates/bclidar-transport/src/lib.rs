//! Serial byte-channel abstraction for bclidar sensor drivers.
//!
//! This is the lowest layer of bclidar. Drivers talk to a device through the
//! [`Channel`] trait; [`SerialChannel`] is the `serialport`-backed
//! implementation used for real hardware.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{list_ports, PortDescription, SerialChannel, SerialConfig};
pub use traits::Channel;
