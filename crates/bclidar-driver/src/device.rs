//! Connection-state wrapper around a [`LidarDriver`].
//!
//! Every operation checks the device state first. When the state does not
//! allow the operation it is skipped: the driver is not touched and the
//! caller gets [`Outcome::Skipped`], which the C boundary reports as
//! status 0.

use std::time::Duration;

use bclidar_protocol::{format_sentence, format_string_line};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_TIMEOUT, SCAN_BATCH_CAPACITY};
use crate::error::{DriverError, Result};
use crate::traits::LidarDriver;
use crate::{DeviceHealth, DeviceInfo, MeasurementNode, ScanMode};

pub const STATUS_OK: i32 = 0;
pub const STATUS_UNEXPECTED: i32 = -1;
pub const STATUS_NULL_ARGUMENT: i32 = -99;

/// Result of a guarded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The driver ran the operation.
    Done(T),
    /// The device was not in the required state.
    Skipped,
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Skipped => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Skipped => Outcome::Skipped,
        }
    }
}

/// Failures surfaced by [`LidarDevice`] and the C boundary.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// A required output argument was null.
    #[error("required argument is null")]
    NullArgument,

    /// The driver reported a failure.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Anything else, e.g. a caught panic.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl DeviceError {
    /// Signed status reported across the C ABI.
    pub fn status_code(&self) -> i32 {
        match self {
            DeviceError::NullArgument => STATUS_NULL_ARGUMENT,
            DeviceError::Driver(err) => err.status_code(),
            DeviceError::Unexpected(_) => STATUS_UNEXPECTED,
        }
    }
}

pub type DeviceResult<T> = std::result::Result<Outcome<T>, DeviceError>;

/// Nodes copied by a grab and whether ordering them succeeded.
///
/// The count stays meaningful when ordering fails; the buffer then holds
/// the nodes in arrival order.
#[derive(Debug)]
pub struct GrabbedScan {
    pub count: usize,
    pub ordered: std::result::Result<(), DriverError>,
}

type DriverFactory<D> = Box<dyn FnMut() -> Result<D> + Send>;

/// A lidar owned by the caller.
///
/// States: uninitialized (no driver), initialized, connected. The driver
/// is created by [`initialize`](Self::initialize) and released by
/// [`dispose`](Self::dispose).
pub struct LidarDevice<D> {
    factory: DriverFactory<D>,
    driver: Option<D>,
}

fn skipped<T>(operation: &'static str) -> DeviceResult<T> {
    debug!(operation, "skipped: device not in required state");
    Ok(Outcome::Skipped)
}

impl<D: LidarDriver> LidarDevice<D> {
    /// Create an uninitialized device whose driver comes from `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut() -> Result<D> + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
            driver: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.driver.is_some()
    }

    pub fn driver(&self) -> Option<&D> {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> Option<&mut D> {
        self.driver.as_mut()
    }

    fn connected(&mut self) -> Option<&mut D> {
        self.driver.as_mut().filter(|driver| driver.is_connected())
    }

    fn not_connected(&mut self) -> Option<&mut D> {
        self.driver.as_mut().filter(|driver| !driver.is_connected())
    }

    /// Create the driver if there is none. Idempotent.
    pub fn initialize(&mut self) -> std::result::Result<(), DeviceError> {
        if self.driver.is_none() {
            self.driver = Some((self.factory)()?);
            info!("lidar driver created");
        }
        Ok(())
    }

    /// Stop scanning and the motor if connected, disconnect and release
    /// the driver.
    ///
    /// A failing stop leaves the driver in place so the call can be retried.
    pub fn dispose(&mut self) -> DeviceResult<()> {
        let Some(driver) = self.driver.as_mut() else {
            return skipped("dispose");
        };
        if driver.is_connected() {
            driver.stop(DEFAULT_TIMEOUT)?;
            driver.stop_motor()?;
            driver.disconnect();
        }
        self.driver = None;
        info!("lidar driver released");
        Ok(Outcome::Done(()))
    }

    pub fn connect(&mut self, port: &str, baud_rate: u32, flags: u32) -> DeviceResult<()> {
        let Some(driver) = self.not_connected() else {
            return skipped("connect");
        };
        driver.connect(port, baud_rate, flags)?;
        Ok(Outcome::Done(()))
    }

    /// Disconnect. Runs only while the driver reports *not* connected.
    pub fn disconnect(&mut self) -> DeviceResult<()> {
        let Some(driver) = self.not_connected() else {
            return skipped("disconnect");
        };
        driver.disconnect();
        Ok(Outcome::Done(()))
    }

    pub fn is_connected(&self) -> bool {
        self.driver
            .as_ref()
            .is_some_and(|driver| driver.is_connected())
    }

    /// Reset the device core. Runs only while the driver reports *not*
    /// connected.
    pub fn reset(&mut self, timeout: Duration) -> DeviceResult<()> {
        let Some(driver) = self.not_connected() else {
            return skipped("reset");
        };
        driver.reset(timeout)?;
        Ok(Outcome::Done(()))
    }

    pub fn clear_rx_cache(&mut self) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("clear_rx_cache");
        };
        driver.clear_rx_cache()?;
        Ok(Outcome::Done(()))
    }

    pub fn health(&mut self, timeout: Duration) -> DeviceResult<DeviceHealth> {
        let Some(driver) = self.connected() else {
            return skipped("health");
        };
        Ok(Outcome::Done(driver.health(timeout)?))
    }

    pub fn device_info(&mut self, timeout: Duration) -> DeviceResult<DeviceInfo> {
        let Some(driver) = self.connected() else {
            return skipped("device_info");
        };
        Ok(Outcome::Done(driver.device_info(timeout)?))
    }

    pub fn set_motor_pwm(&mut self, pwm: u16) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("set_motor_pwm");
        };
        driver.set_motor_pwm(pwm)?;
        Ok(Outcome::Done(()))
    }

    pub fn set_spin_speed(&mut self, rpm: u16, timeout: Duration) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("set_spin_speed");
        };
        driver.set_spin_speed(rpm, timeout)?;
        Ok(Outcome::Done(()))
    }

    pub fn start_motor(&mut self) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("start_motor");
        };
        driver.start_motor()?;
        Ok(Outcome::Done(()))
    }

    pub fn stop_motor(&mut self) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("stop_motor");
        };
        driver.stop_motor()?;
        Ok(Outcome::Done(()))
    }

    pub fn check_motor_ctrl_support(&mut self, timeout: Duration) -> DeviceResult<bool> {
        let Some(driver) = self.connected() else {
            return skipped("check_motor_ctrl_support");
        };
        Ok(Outcome::Done(driver.check_motor_ctrl_support(timeout)?))
    }

    pub fn check_is_tof(&mut self, timeout: Duration) -> DeviceResult<bool> {
        let Some(driver) = self.connected() else {
            return skipped("check_is_tof");
        };
        Ok(Outcome::Done(driver.check_is_tof(timeout)?))
    }

    pub fn frequency(&mut self, mode: &ScanMode, count: usize) -> DeviceResult<f32> {
        let Some(driver) = self.connected() else {
            return skipped("frequency");
        };
        Ok(Outcome::Done(driver.frequency(mode, count)))
    }

    pub fn start_scan_normal(&mut self, force: bool, timeout: Duration) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("start_scan_normal");
        };
        driver.start_scan_normal(force, timeout)?;
        Ok(Outcome::Done(()))
    }

    /// Log the supported scan modes, then start scanning in `mode_id`.
    ///
    /// Failing to enumerate modes is logged and does not prevent the start.
    pub fn start_scan(&mut self, force: bool, mode_id: u16, options: u32) -> DeviceResult<ScanMode> {
        let Some(driver) = self.connected() else {
            return skipped("start_scan");
        };

        match driver.supported_scan_modes(DEFAULT_TIMEOUT) {
            Ok(modes) => {
                for mode in &modes {
                    info!(
                        name = %mode.name,
                        max_distance = mode.max_distance,
                        ans_type = mode.ans_type,
                        id = mode.id,
                        us_per_sample = mode.us_per_sample,
                        "supported scan mode"
                    );
                }
            }
            Err(err) => warn!(error = %err, "could not enumerate scan modes"),
        }

        let mode = driver.start_scan_express(force, mode_id, options, DEFAULT_TIMEOUT)?;
        Ok(Outcome::Done(mode))
    }

    pub fn stop(&mut self, timeout: Duration) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("stop");
        };
        driver.stop(timeout)?;
        Ok(Outcome::Done(()))
    }

    pub fn sort_scan_data_ascend(&mut self, nodes: &mut [MeasurementNode]) -> DeviceResult<()> {
        let Some(driver) = self.connected() else {
            return skipped("sort_scan_data_ascend");
        };
        driver.ascend_scan_data(nodes)?;
        Ok(Outcome::Done(()))
    }

    pub fn scan_data_with_interval(&mut self, nodes: &mut [MeasurementNode]) -> DeviceResult<usize> {
        let Some(driver) = self.connected() else {
            return skipped("scan_data_with_interval");
        };
        Ok(Outcome::Done(driver.scan_data_with_interval(nodes)?))
    }

    /// Grab the latest rotation into `nodes` and order it by angle.
    pub fn grab_scan_data(
        &mut self,
        nodes: &mut [MeasurementNode],
        timeout: Duration,
    ) -> DeviceResult<GrabbedScan> {
        let Some(driver) = self.connected() else {
            return skipped("grab_scan_data");
        };
        let count = driver.grab_scan_data(nodes, timeout)?;
        let ordered = driver.ascend_scan_data(&mut nodes[..count]);
        if let Err(err) = &ordered {
            warn!(count, error = %err, "grabbed rotation could not be ordered");
        }
        debug!(capacity = nodes.len(), count, "grab_scan_data");
        Ok(Outcome::Done(GrabbedScan { count, ordered }))
    }

    fn grab_batch(&mut self, timeout: Duration) -> DeviceResult<Vec<MeasurementNode>> {
        let mut nodes = vec![MeasurementNode::default(); SCAN_BATCH_CAPACITY];
        let Outcome::Done(grabbed) = self.grab_scan_data(&mut nodes, timeout)? else {
            return Ok(Outcome::Skipped);
        };
        grabbed.ordered?;
        nodes.truncate(grabbed.count);
        Ok(Outcome::Done(nodes))
    }

    /// Grab one rotation and format each node as a checksummed sentence.
    pub fn nmea_sentences(&mut self, sensor_id: u32, timeout: Duration) -> DeviceResult<Vec<String>> {
        Ok(self.grab_batch(timeout)?.map(|nodes| {
            nodes
                .iter()
                .map(|node| format_sentence(sensor_id, node))
                .collect()
        }))
    }

    /// Grab one rotation and format each node as `angle;distance`.
    pub fn string_data(&mut self, timeout: Duration) -> DeviceResult<Vec<String>> {
        Ok(self
            .grab_batch(timeout)?
            .map(|nodes| nodes.iter().map(format_string_line).collect()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bclidar_protocol::{nmea_checksum, parse_sentence};

    use super::*;
    use crate::error::RESULT_OPERATION_FAIL;

    #[derive(Default)]
    struct Script {
        calls: Vec<&'static str>,
        connected: bool,
        fail_stop: bool,
        rotation: Vec<MeasurementNode>,
    }

    /// Driver double that records the operations it receives.
    struct RecordingDriver {
        script: Arc<Mutex<Script>>,
    }

    impl RecordingDriver {
        fn record(&self, call: &'static str) {
            self.script.lock().unwrap().calls.push(call);
        }
    }

    impl LidarDriver for RecordingDriver {
        fn connect(&mut self, _port: &str, _baud_rate: u32, _flags: u32) -> Result<()> {
            self.record("connect");
            self.script.lock().unwrap().connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            self.record("disconnect");
            self.script.lock().unwrap().connected = false;
        }

        fn is_connected(&self) -> bool {
            self.script.lock().unwrap().connected
        }

        fn reset(&mut self, _timeout: Duration) -> Result<()> {
            self.record("reset");
            Ok(())
        }

        fn clear_rx_cache(&mut self) -> Result<()> {
            self.record("clear_rx_cache");
            Ok(())
        }

        fn health(&mut self, _timeout: Duration) -> Result<DeviceHealth> {
            self.record("health");
            Ok(DeviceHealth::default())
        }

        fn device_info(&mut self, _timeout: Duration) -> Result<DeviceInfo> {
            self.record("device_info");
            Ok(DeviceInfo::default())
        }

        fn set_motor_pwm(&mut self, _pwm: u16) -> Result<()> {
            self.record("set_motor_pwm");
            Ok(())
        }

        fn set_spin_speed(&mut self, _rpm: u16, _timeout: Duration) -> Result<()> {
            self.record("set_spin_speed");
            Ok(())
        }

        fn start_motor(&mut self) -> Result<()> {
            self.record("start_motor");
            Ok(())
        }

        fn stop_motor(&mut self) -> Result<()> {
            self.record("stop_motor");
            Ok(())
        }

        fn check_motor_ctrl_support(&mut self, _timeout: Duration) -> Result<bool> {
            self.record("check_motor_ctrl_support");
            Ok(true)
        }

        fn check_is_tof(&mut self, _timeout: Duration) -> Result<bool> {
            self.record("check_is_tof");
            Ok(false)
        }

        fn supported_scan_modes(&mut self, _timeout: Duration) -> Result<Vec<ScanMode>> {
            self.record("supported_scan_modes");
            Ok(vec![ScanMode {
                id: 2,
                us_per_sample: 100.0,
                name: "Boost".into(),
                ..Default::default()
            }])
        }

        fn typical_scan_mode(&mut self, _timeout: Duration) -> Result<u16> {
            self.record("typical_scan_mode");
            Ok(2)
        }

        fn start_scan_normal(&mut self, _force: bool, _timeout: Duration) -> Result<()> {
            self.record("start_scan_normal");
            Ok(())
        }

        fn start_scan_express(
            &mut self,
            _force: bool,
            mode_id: u16,
            _options: u32,
            _timeout: Duration,
        ) -> Result<ScanMode> {
            self.record("start_scan_express");
            Ok(ScanMode {
                id: mode_id,
                ..Default::default()
            })
        }

        fn stop(&mut self, _timeout: Duration) -> Result<()> {
            self.record("stop");
            if self.script.lock().unwrap().fail_stop {
                return Err(DriverError::OperationFailed("stop".into()));
            }
            Ok(())
        }

        fn grab_scan_data(
            &mut self,
            nodes: &mut [MeasurementNode],
            _timeout: Duration,
        ) -> Result<usize> {
            self.record("grab_scan_data");
            let script = self.script.lock().unwrap();
            let count = nodes.len().min(script.rotation.len());
            nodes[..count].copy_from_slice(&script.rotation[..count]);
            Ok(count)
        }

        fn scan_data_with_interval(&mut self, _nodes: &mut [MeasurementNode]) -> Result<usize> {
            self.record("scan_data_with_interval");
            Ok(0)
        }
    }

    fn device() -> (LidarDevice<RecordingDriver>, Arc<Mutex<Script>>) {
        let script = Arc::new(Mutex::new(Script::default()));
        let shared = Arc::clone(&script);
        let device = LidarDevice::new(move || {
            Ok(RecordingDriver {
                script: Arc::clone(&shared),
            })
        });
        (device, script)
    }

    fn calls(script: &Arc<Mutex<Script>>) -> Vec<&'static str> {
        script.lock().unwrap().calls.clone()
    }

    fn node(angle: f32, dist_mm_q2: u32, flag: u8) -> MeasurementNode {
        let mut node = MeasurementNode {
            dist_mm_q2,
            quality: 47,
            flag,
            ..Default::default()
        };
        node.set_angle_degrees(angle);
        node
    }

    const TIMEOUT: Duration = Duration::from_millis(50);

    #[test]
    fn uninitialized_device_skips_everything() {
        let (mut device, script) = device();
        assert!(!device.is_initialized());
        assert!(device.connect("COM1", 115_200, 0).unwrap().is_skipped());
        assert!(device.disconnect().unwrap().is_skipped());
        assert!(device.dispose().unwrap().is_skipped());
        assert!(!device.is_connected());
        assert!(calls(&script).is_empty());
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut created = 0;
        let mut device = LidarDevice::new(move || {
            created += 1;
            assert_eq!(created, 1, "factory called twice");
            Ok(RecordingDriver {
                script: Arc::default(),
            })
        });
        device.initialize().unwrap();
        device.initialize().unwrap();
        assert!(device.is_initialized());
    }

    #[test]
    fn factory_failure_is_reported() {
        let mut device: LidarDevice<RecordingDriver> =
            LidarDevice::new(|| Err(DriverError::OperationFailed("no port".into())));
        let err = device.initialize().unwrap_err();
        assert_eq!(err.status_code(), RESULT_OPERATION_FAIL as i32);
        assert!(!device.is_initialized());
    }

    #[test]
    fn connected_operations_skip_while_disconnected() {
        let (mut device, script) = device();
        device.initialize().unwrap();

        assert!(device.clear_rx_cache().unwrap().is_skipped());
        assert!(device.health(TIMEOUT).unwrap().is_skipped());
        assert!(device.device_info(TIMEOUT).unwrap().is_skipped());
        assert!(device.set_motor_pwm(600).unwrap().is_skipped());
        assert!(device.set_spin_speed(600, TIMEOUT).unwrap().is_skipped());
        assert!(device.start_motor().unwrap().is_skipped());
        assert!(device.stop_motor().unwrap().is_skipped());
        assert!(device.check_motor_ctrl_support(TIMEOUT).unwrap().is_skipped());
        assert!(device.check_is_tof(TIMEOUT).unwrap().is_skipped());
        assert!(device
            .frequency(&ScanMode::default(), 100)
            .unwrap()
            .is_skipped());
        assert!(device.start_scan_normal(false, TIMEOUT).unwrap().is_skipped());
        assert!(device.start_scan(false, 1, 0).unwrap().is_skipped());
        assert!(device.stop(TIMEOUT).unwrap().is_skipped());
        let mut nodes = [MeasurementNode::default(); 4];
        assert!(device.sort_scan_data_ascend(&mut nodes).unwrap().is_skipped());
        assert!(device
            .scan_data_with_interval(&mut nodes)
            .unwrap()
            .is_skipped());
        assert!(device.grab_scan_data(&mut nodes, TIMEOUT).unwrap().is_skipped());
        assert!(device.nmea_sentences(1, TIMEOUT).unwrap().is_skipped());
        assert!(device.string_data(TIMEOUT).unwrap().is_skipped());

        assert!(calls(&script).is_empty());
    }

    #[test]
    fn second_connect_is_a_no_op() {
        let (mut device, script) = device();
        device.initialize().unwrap();
        assert!(device.connect("COM3", 115_200, 0).unwrap().is_done());
        assert!(device.is_connected());
        assert!(device.connect("COM3", 115_200, 0).unwrap().is_skipped());
        assert_eq!(calls(&script), vec!["connect"]);
    }

    #[test]
    fn disconnect_and_reset_only_run_while_not_connected() {
        let (mut device, script) = device();
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        assert!(device.disconnect().unwrap().is_skipped());
        assert!(device.reset(TIMEOUT).unwrap().is_skipped());
        assert_eq!(calls(&script), vec!["connect"]);

        script.lock().unwrap().connected = false;
        assert!(device.reset(TIMEOUT).unwrap().is_done());
        assert!(device.disconnect().unwrap().is_done());
        assert_eq!(calls(&script), vec!["connect", "reset", "disconnect"]);
    }

    #[test]
    fn dispose_stops_and_releases() {
        let (mut device, script) = device();
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        assert!(device.dispose().unwrap().is_done());
        assert!(!device.is_initialized());
        assert_eq!(
            calls(&script),
            vec!["connect", "stop", "stop_motor", "disconnect"]
        );
    }

    #[test]
    fn dispose_keeps_driver_when_stop_fails() {
        let (mut device, script) = device();
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();
        script.lock().unwrap().fail_stop = true;

        let err = device.dispose().unwrap_err();
        assert_eq!(err.status_code(), RESULT_OPERATION_FAIL as i32);
        assert!(device.is_initialized());
        assert!(device.is_connected());
    }

    #[test]
    fn start_scan_enumerates_modes_first() {
        let (mut device, script) = device();
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        let mode = device.start_scan(false, 2, 0).unwrap().done().unwrap();
        assert_eq!(mode.id, 2);
        assert_eq!(
            calls(&script),
            vec!["connect", "supported_scan_modes", "start_scan_express"]
        );
    }

    #[test]
    fn frequency_uses_driver_formula() {
        let (mut device, _script) = device();
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();
        let mode = ScanMode {
            us_per_sample: 500.0,
            ..Default::default()
        };
        assert_eq!(device.frequency(&mode, 400).unwrap(), Outcome::Done(5.0));
    }

    #[test]
    fn grab_orders_rotation() {
        let (mut device, script) = device();
        script.lock().unwrap().rotation = vec![node(200.0, 8, 0), node(10.0, 4, 1)];
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        let mut nodes = [MeasurementNode::default(); 8];
        let grabbed = device.grab_scan_data(&mut nodes, TIMEOUT).unwrap().done().unwrap();
        assert_eq!(grabbed.count, 2);
        assert!(grabbed.ordered.is_ok());
        assert_eq!(nodes[0].dist_mm_q2, 4);
        assert_eq!(nodes[1].dist_mm_q2, 8);
    }

    #[test]
    fn grab_reports_count_when_ordering_fails() {
        let (mut device, script) = device();
        script.lock().unwrap().rotation = vec![node(1.0, 0, 0); 3];
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        let mut nodes = [MeasurementNode::default(); 8];
        let grabbed = device.grab_scan_data(&mut nodes, TIMEOUT).unwrap().done().unwrap();
        assert_eq!(grabbed.count, 3);
        assert!(grabbed.ordered.is_err());

        assert!(device.nmea_sentences(1, TIMEOUT).is_err());
    }

    #[test]
    fn nmea_sentences_are_checksummed() {
        let (mut device, script) = device();
        script.lock().unwrap().rotation = vec![node(90.0, 4000, 1), node(45.0, 8, 0)];
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        let sentences = device.nmea_sentences(5, TIMEOUT).unwrap().done().unwrap();
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].starts_with("$bclidar,5,N,45.00,2.00,47*"));
        assert!(sentences[1].starts_with("$bclidar,5,S,90.00,1000.00,47*"));
        for sentence in &sentences {
            let (_, digits) = sentence.split_once('*').unwrap();
            assert_eq!(digits, format!("{:02X}", nmea_checksum(sentence)));
            assert!(parse_sentence(sentence).is_ok());
        }
    }

    #[test]
    fn string_data_lines() {
        let (mut device, script) = device();
        script.lock().unwrap().rotation = vec![node(90.0, 6, 0)];
        device.initialize().unwrap();
        device.connect("COM3", 115_200, 0).unwrap();

        let lines = device.string_data(TIMEOUT).unwrap().done().unwrap();
        assert_eq!(lines, vec!["90.00;1.50".to_string()]);
    }
}
