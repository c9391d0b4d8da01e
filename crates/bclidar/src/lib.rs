//! RPLIDAR access over serial.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial byte channels and port discovery
//! - [`protocol`]: wire codec, measurement decoding and sentence formatting
//! - [`driver`]: the serial driver and the [`driver::LidarDevice`] wrapper
//!
//! The C library lives in `bclidar-ffi`; the `bclidar` binary is built with
//! the `cli` feature.

/// Re-export transport types.
pub mod transport {
    pub use bclidar_transport::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use bclidar_protocol::*;
}

/// Re-export driver types.
pub mod driver {
    pub use bclidar_driver::*;
}
