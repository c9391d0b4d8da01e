use std::time::Duration;

use bclidar_protocol::{DeviceHealth, DeviceInfo, MeasurementNode, ScanMode};

use crate::error::Result;
use crate::scan;

/// Operations a lidar driver exposes to [`LidarDevice`](crate::LidarDevice).
///
/// Methods that talk to the device take an explicit timeout. Scan data is
/// delivered through caller-owned buffers; the returned count says how many
/// leading entries were written.
pub trait LidarDriver: Send {
    /// Open the serial port. `flags` is reserved and passed through.
    fn connect(&mut self, port: &str, baud_rate: u32, flags: u32) -> Result<()>;

    /// Stop any scan and close the port.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Ask the device core to reboot.
    fn reset(&mut self, timeout: Duration) -> Result<()>;

    /// Drop bytes received but not yet decoded.
    fn clear_rx_cache(&mut self) -> Result<()>;

    fn health(&mut self, timeout: Duration) -> Result<DeviceHealth>;

    fn device_info(&mut self, timeout: Duration) -> Result<DeviceInfo>;

    fn set_motor_pwm(&mut self, pwm: u16) -> Result<()>;

    /// Set the spin speed of time-of-flight devices.
    fn set_spin_speed(&mut self, rpm: u16, timeout: Duration) -> Result<()>;

    fn start_motor(&mut self) -> Result<()>;

    fn stop_motor(&mut self) -> Result<()>;

    /// True when the accessory board drives the motor by PWM.
    fn check_motor_ctrl_support(&mut self, timeout: Duration) -> Result<bool>;

    fn check_is_tof(&mut self, timeout: Duration) -> Result<bool>;

    /// Rotation frequency in Hz for `count` samples per rotation in `mode`.
    fn frequency(&self, mode: &ScanMode, count: usize) -> f32 {
        if count == 0 || mode.us_per_sample <= 0.0 {
            return 0.0;
        }
        1_000_000.0 / (count as f32 * mode.us_per_sample)
    }

    fn supported_scan_modes(&mut self, timeout: Duration) -> Result<Vec<ScanMode>>;

    /// Mode id the device recommends.
    fn typical_scan_mode(&mut self, timeout: Duration) -> Result<u16>;

    fn start_scan_normal(&mut self, force: bool, timeout: Duration) -> Result<()>;

    /// Start scanning in `mode_id` and report the mode actually used.
    fn start_scan_express(
        &mut self,
        force: bool,
        mode_id: u16,
        options: u32,
        timeout: Duration,
    ) -> Result<ScanMode>;

    fn stop(&mut self, timeout: Duration) -> Result<()>;

    /// Copy the most recent full rotation into `nodes`, waiting up to
    /// `timeout` for one to arrive.
    fn grab_scan_data(&mut self, nodes: &mut [MeasurementNode], timeout: Duration)
        -> Result<usize>;

    /// Drain the nodes received since the previous call.
    fn scan_data_with_interval(&mut self, nodes: &mut [MeasurementNode]) -> Result<usize>;

    /// Fill invalid angles and sort by angle.
    fn ascend_scan_data(&self, nodes: &mut [MeasurementNode]) -> Result<()> {
        scan::ascend_scan_data(nodes)
    }
}
