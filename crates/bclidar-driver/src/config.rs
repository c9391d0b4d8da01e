use std::time::Duration;

use bclidar_transport::SerialConfig;

/// Default serial speed of A-series devices.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default timeout for device queries and scan grabs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Measurement capacity used for sentence and string batches.
pub const SCAN_BATCH_CAPACITY: usize = 8192;

/// Configuration for [`SerialLidarDriver`](crate::SerialLidarDriver).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Serial port settings applied on connect.
    pub serial: SerialConfig,
    /// PWM duty applied by `start_motor` on boards with motor control. Default: 660.
    pub motor_pwm: u16,
    /// Delay after each motor change. Default: 500 ms.
    pub motor_settle: Duration,
    /// Timeout of the accessory board query issued on connect. Default: 2 s.
    pub query_timeout: Duration,
    /// Maximum nodes kept per rotation and in the interval buffer. Default: 8192.
    pub scan_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            motor_pwm: 660,
            motor_settle: Duration::from_millis(500),
            query_timeout: DEFAULT_TIMEOUT,
            scan_capacity: SCAN_BATCH_CAPACITY,
        }
    }
}
