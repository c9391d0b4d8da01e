//! RPLIDAR driver and device lifecycle wrapper.
//!
//! [`SerialLidarDriver`] speaks the serial protocol and keeps the latest
//! full rotation in a background cache. [`LidarDevice`] wraps any
//! [`LidarDriver`] with the connection-state guards host applications
//! expect: operations issued in the wrong state are skipped rather than
//! failed.

pub mod config;
pub mod device;
pub mod error;
pub mod scan;
pub mod serial_driver;
pub mod traits;

pub use bclidar_protocol::{DeviceHealth, DeviceInfo, HealthStatus, MeasurementNode, ScanMode};
pub use config::{DriverConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT, SCAN_BATCH_CAPACITY};
pub use device::{
    DeviceError, DeviceResult, GrabbedScan, LidarDevice, Outcome, STATUS_NULL_ARGUMENT, STATUS_OK,
    STATUS_UNEXPECTED,
};
pub use error::{
    DriverError, Result, RESULT_ALREADY_DONE, RESULT_FORMAT_NOT_SUPPORT, RESULT_INSUFFICIENT_MEMORY,
    RESULT_INVALID_DATA, RESULT_OK, RESULT_OPERATION_FAIL, RESULT_OPERATION_NOT_SUPPORT,
    RESULT_OPERATION_STOP, RESULT_OPERATION_TIMEOUT,
};
pub use scan::ascend_scan_data;
pub use serial_driver::SerialLidarDriver;
pub use traits::LidarDriver;
