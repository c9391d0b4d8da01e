use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bclidar_protocol::command::{
    ACC_BOARD_FLAG_MOTOR_CTRL, ANS_TYPE_ACC_BOARD_FLAG, ANS_TYPE_DEVHEALTH, ANS_TYPE_DEVINFO,
    ANS_TYPE_GET_LIDAR_CONF, ANS_TYPE_MEASUREMENT, ANS_TYPE_MEASUREMENT_CAPSULED,
    ANS_TYPE_SAMPLE_RATE, CMD_EXPRESS_SCAN, CMD_FORCE_SCAN, CMD_GET_ACC_BOARD_FLAG,
    CMD_GET_DEVICE_HEALTH, CMD_GET_DEVICE_INFO, CMD_GET_LIDAR_CONF, CMD_GET_SAMPLERATE,
    CMD_HQ_MOTOR_SPEED_CTRL, CMD_RESET, CMD_SCAN, CMD_SET_MOTOR_PWM, CMD_STOP,
    CONF_SCAN_MODE_ANS_TYPE, CONF_SCAN_MODE_COUNT, CONF_SCAN_MODE_MAX_DISTANCE,
    CONF_SCAN_MODE_NAME, CONF_SCAN_MODE_TYPICAL, CONF_SCAN_MODE_US_PER_SAMPLE,
    FIRMWARE_LIDAR_CONF,
};
use bclidar_protocol::types::{
    conf_q8, conf_string, conf_u16, conf_u32, conf_u8, conf_value, encode_conf_request,
};
use bclidar_protocol::{
    decode_standard_nodes, CapsuleDecoder, CapsuleKind, CommandWriter, DeviceHealth, DeviceInfo,
    MeasurementNode, ResponseReader, SampleRate, ScanMode, STANDARD_NODE_SIZE,
};
use bclidar_transport::{Channel, SerialChannel};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::traits::LidarDriver;

type Opener<C> = Box<dyn FnMut(&str, u32) -> bclidar_transport::Result<C> + Send>;

/// Mode ids reported by devices without lidar configuration support.
const LEGACY_MODE_STANDARD: u16 = 0;
const LEGACY_MODE_EXPRESS: u16 = 1;
const LEGACY_MAX_DISTANCE: f32 = 16.0;
const LEGACY_EXPRESS_WORKING_MODE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanFormat {
    Standard,
    Capsule(CapsuleKind),
}

impl ScanFormat {
    fn for_answer(answer_type: u8) -> Option<Self> {
        if answer_type == ANS_TYPE_MEASUREMENT {
            return Some(ScanFormat::Standard);
        }
        CapsuleKind::for_answer(answer_type).map(ScanFormat::Capsule)
    }

    fn packet_size(self) -> usize {
        match self {
            ScanFormat::Standard => STANDARD_NODE_SIZE,
            ScanFormat::Capsule(kind) => kind.size(),
        }
    }
}

struct Link<C> {
    port: String,
    /// `None` while a scan thread owns the receive side.
    reader: Option<ResponseReader<C>>,
    writer: CommandWriter<C>,
}

struct ScanWorker<C> {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<ResponseReader<C>>,
}

#[derive(Default)]
struct CacheState {
    scan: Vec<MeasurementNode>,
    fresh: bool,
    interval: Vec<MeasurementNode>,
}

/// Latest full rotation plus everything received since the last interval
/// drain, shared with the scan thread.
struct ScanCache {
    state: Mutex<CacheState>,
    ready: Condvar,
    capacity: usize,
}

impl ScanCache {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ready: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        let mut state = self.lock();
        state.scan.clear();
        state.fresh = false;
        state.interval.clear();
    }

    /// Fold decoded nodes into the rotation under construction, publishing
    /// it when the next rotation starts.
    fn absorb(&self, nodes: &[MeasurementNode], rotation: &mut Vec<MeasurementNode>) {
        let mut published = false;
        let mut state = self.lock();
        for &node in nodes {
            if node.is_sync() {
                if rotation.first().is_some_and(MeasurementNode::is_sync) {
                    state.scan.clear();
                    state.scan.extend_from_slice(rotation);
                    state.fresh = true;
                    published = true;
                }
                rotation.clear();
            }
            push_bounded(rotation, node, self.capacity);
            push_bounded(&mut state.interval, node, self.capacity);
        }
        drop(state);

        if published {
            self.ready.notify_all();
        }
    }

    fn wait_scan(&self, out: &mut [MeasurementNode], timeout: Duration) -> Result<usize> {
        let guard = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |state| !state.fresh)
            .unwrap_or_else(PoisonError::into_inner);
        if !state.fresh || state.scan.is_empty() {
            return Err(DriverError::Timeout);
        }

        let count = out.len().min(state.scan.len());
        out[..count].copy_from_slice(&state.scan[..count]);
        state.fresh = false;
        Ok(count)
    }

    fn drain_interval(&self, out: &mut [MeasurementNode]) -> usize {
        let mut state = self.lock();
        let count = out.len().min(state.interval.len());
        out[..count].copy_from_slice(&state.interval[..count]);
        state.interval.clear();
        count
    }
}

/// Append `node`, overwriting the last slot once `capacity` is reached.
fn push_bounded(buf: &mut Vec<MeasurementNode>, node: MeasurementNode, capacity: usize) {
    if buf.len() < capacity {
        buf.push(node);
    } else if let Some(last) = buf.last_mut() {
        *last = node;
    }
}

fn scan_loop<C: Channel>(
    mut reader: ResponseReader<C>,
    format: ScanFormat,
    shutdown: Arc<AtomicBool>,
    cache: Arc<ScanCache>,
) -> ResponseReader<C> {
    let mut capsules = match format {
        ScanFormat::Capsule(kind) => Some(CapsuleDecoder::new(kind)),
        ScanFormat::Standard => None,
    };
    let mut nodes = Vec::with_capacity(256);
    let mut rotation = Vec::with_capacity(cache.capacity);

    debug!(?format, "scan thread started");
    loop {
        nodes.clear();
        match capsules.as_mut() {
            Some(decoder) => decoder.decode(reader.buffer_mut(), &mut nodes),
            None => decode_standard_nodes(reader.buffer_mut(), &mut nodes),
        };
        if !nodes.is_empty() {
            cache.absorb(&nodes, &mut rotation);
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if let Err(err) = reader.fill_once() {
            warn!(error = %err, "scan thread stopped on read error");
            break;
        }
    }
    debug!("scan thread exiting");
    reader
}

/// RPLIDAR driver over a serial [`Channel`].
///
/// While scanning, a background thread owns the receive side of the
/// channel and publishes each complete rotation. Query commands stop that
/// thread first.
pub struct SerialLidarDriver<C: Channel = SerialChannel> {
    config: DriverConfig,
    opener: Opener<C>,
    link: Option<Link<C>>,
    worker: Option<ScanWorker<C>>,
    cache: Arc<ScanCache>,
    motor_ctrl: Option<bool>,
    lidar_conf: Option<bool>,
}

impl SerialLidarDriver<SerialChannel> {
    /// Driver that opens OS serial ports.
    pub fn new(config: DriverConfig) -> Self {
        let serial = config.serial.clone();
        Self::with_opener(config, move |port, baud_rate| {
            SerialChannel::open_with_config(port, baud_rate, &serial)
        })
    }
}

impl Default for SerialLidarDriver<SerialChannel> {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl<C: Channel> SerialLidarDriver<C> {
    /// Driver that obtains its channel from `opener` on connect.
    pub fn with_opener<F>(config: DriverConfig, opener: F) -> Self
    where
        F: FnMut(&str, u32) -> bclidar_transport::Result<C> + Send + 'static,
    {
        let cache = Arc::new(ScanCache::new(config.scan_capacity));
        Self {
            config,
            opener: Box::new(opener),
            link: None,
            worker: None,
            cache,
            motor_ctrl: None,
            lidar_conf: None,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.port.as_str())
    }

    pub fn is_scanning(&self) -> bool {
        self.worker.is_some()
    }

    fn link(&mut self) -> Result<&mut Link<C>> {
        self.link.as_mut().ok_or(DriverError::NotConnected)
    }

    /// Stop the scan thread and hand the receive side back to the link.
    fn halt_scan(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.shutdown.store(true, Ordering::Relaxed);
        match worker.handle.join() {
            Ok(reader) => {
                if let Some(link) = self.link.as_mut() {
                    link.reader = Some(reader);
                }
                debug!("scan thread joined");
                Ok(())
            }
            Err(_) => {
                self.link = None;
                Err(DriverError::OperationFailed("scan thread panicked".into()))
            }
        }
    }

    fn send(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        self.link()?.writer.send(cmd, payload)?;
        Ok(())
    }

    /// Send a request and wait for its single-shot answer.
    fn query(
        &mut self,
        cmd: u8,
        payload: &[u8],
        answer_type: u8,
        timeout: Duration,
    ) -> Result<Bytes> {
        self.halt_scan()?;
        let link = self.link()?;
        let reader = link.reader.as_mut().ok_or_else(receive_unavailable)?;
        reader.clear_buffer();
        link.writer.send(cmd, payload)?;
        Ok(reader.read_response(answer_type, timeout)?)
    }

    fn conf(&mut self, key: u32, mode_id: Option<u16>, timeout: Duration) -> Result<Vec<u8>> {
        let request = encode_conf_request(key, mode_id);
        let answer = self.query(
            CMD_GET_LIDAR_CONF,
            &request,
            ANS_TYPE_GET_LIDAR_CONF,
            timeout,
        )?;
        Ok(conf_value(key, &answer)?.to_vec())
    }

    fn sample_rate(&mut self, timeout: Duration) -> Result<SampleRate> {
        let answer = self.query(CMD_GET_SAMPLERATE, &[], ANS_TYPE_SAMPLE_RATE, timeout)?;
        Ok(SampleRate::decode(&answer)?)
    }

    /// Firmware 1.24 and later describe their scan modes through lidar
    /// configuration queries.
    fn supports_lidar_conf(&mut self, timeout: Duration) -> Result<bool> {
        if let Some(supported) = self.lidar_conf {
            return Ok(supported);
        }
        let info = self.device_info(timeout)?;
        let supported = info.firmware_version >= FIRMWARE_LIDAR_CONF;
        self.lidar_conf = Some(supported);
        Ok(supported)
    }

    fn scan_mode(&mut self, id: u16, timeout: Duration) -> Result<ScanMode> {
        let us_per_sample = conf_q8(&self.conf(CONF_SCAN_MODE_US_PER_SAMPLE, Some(id), timeout)?)?;
        let max_distance = conf_q8(&self.conf(CONF_SCAN_MODE_MAX_DISTANCE, Some(id), timeout)?)?;
        let ans_type = conf_u8(&self.conf(CONF_SCAN_MODE_ANS_TYPE, Some(id), timeout)?)?;
        let name = conf_string(&self.conf(CONF_SCAN_MODE_NAME, Some(id), timeout)?);
        Ok(ScanMode {
            id,
            us_per_sample,
            max_distance,
            ans_type,
            name,
        })
    }

    /// Read the accessory board once per connection. Motor switching uses
    /// the cached answer.
    fn query_motor_ctrl(&mut self) -> bool {
        match self.check_motor_ctrl_support(self.config.query_timeout) {
            Ok(supported) => supported,
            Err(err) => {
                warn!(error = %err, "accessory board query failed, using DTR motor control");
                self.motor_ctrl = Some(false);
                false
            }
        }
    }

    fn set_motor(&mut self, on: bool) -> Result<()> {
        if self.motor_ctrl.unwrap_or(false) {
            let pwm = if on { self.config.motor_pwm } else { 0 };
            self.set_motor_pwm(pwm)?;
        } else {
            // Low DTR powers the motor on adapters without PWM control.
            self.link()?.writer.get_mut().set_dtr(!on)?;
        }
        info!(on, "motor switched");
        thread::sleep(self.config.motor_settle);
        Ok(())
    }

    /// Send a scan command, validate its stream descriptor and hand the
    /// receive side to a new scan thread.
    fn begin_scan(
        &mut self,
        cmd: u8,
        payload: &[u8],
        answer_type: u8,
        format: ScanFormat,
        timeout: Duration,
    ) -> Result<()> {
        self.halt_scan()?;
        let link = self.link()?;
        let mut reader = link.reader.take().ok_or_else(receive_unavailable)?;
        reader.clear_buffer();

        let started = match link.writer.send(cmd, payload) {
            Ok(()) => reader
                .read_descriptor(answer_type, timeout)
                .map_err(DriverError::from),
            Err(err) => Err(err.into()),
        };
        let started = started.and_then(|descriptor| {
            if (descriptor.len as usize) < format.packet_size() {
                Err(DriverError::InvalidData(format!(
                    "scan packet length {} below {}",
                    descriptor.len,
                    format.packet_size()
                )))
            } else {
                Ok(descriptor)
            }
        });
        if let Err(err) = started {
            link.reader = Some(reader);
            return Err(err);
        }

        self.cache.reset();
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let cache = Arc::clone(&self.cache);
        let spawned = thread::Builder::new()
            .name("bclidar-scan".to_string())
            .spawn(move || scan_loop(reader, format, thread_shutdown, cache));

        match spawned {
            Ok(handle) => {
                self.worker = Some(ScanWorker { shutdown, handle });
                info!(?format, "scan started");
                Ok(())
            }
            Err(err) => {
                self.link = None;
                Err(DriverError::Spawn(err))
            }
        }
    }
}

fn receive_unavailable() -> DriverError {
    DriverError::OperationFailed("receive channel unavailable".into())
}

impl<C: Channel> LidarDriver for SerialLidarDriver<C> {
    fn connect(&mut self, port: &str, baud_rate: u32, flags: u32) -> Result<()> {
        if self.link.is_some() {
            debug!(port, "already connected");
            return Ok(());
        }

        let channel = (self.opener)(port, baud_rate)?;
        let writer = CommandWriter::new(channel.try_clone()?);
        self.link = Some(Link {
            port: channel.name(),
            reader: Some(ResponseReader::new(channel)),
            writer,
        });
        self.motor_ctrl = None;
        self.lidar_conf = None;
        let motor_ctrl = self.query_motor_ctrl();

        info!(port, baud_rate, flags, motor_ctrl, "lidar connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.link.is_none() {
            return;
        }
        if let Err(err) = self.halt_scan() {
            warn!(error = %err, "scan thread did not stop cleanly");
        }
        if let Some(mut link) = self.link.take() {
            if let Err(err) = link.writer.send(CMD_STOP, &[]) {
                debug!(error = %err, "stop before disconnect failed");
            }
            info!(port = %link.port, "lidar disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn reset(&mut self, _timeout: Duration) -> Result<()> {
        self.halt_scan()?;
        self.send(CMD_RESET, &[])?;
        info!("reset requested");
        Ok(())
    }

    fn clear_rx_cache(&mut self) -> Result<()> {
        let link = self.link()?;
        link.writer.get_mut().clear_input()?;
        if let Some(reader) = link.reader.as_mut() {
            reader.clear_buffer();
        }
        Ok(())
    }

    fn health(&mut self, timeout: Duration) -> Result<DeviceHealth> {
        let answer = self.query(CMD_GET_DEVICE_HEALTH, &[], ANS_TYPE_DEVHEALTH, timeout)?;
        let health = DeviceHealth::decode(&answer)?;
        debug!(status = %health.status(), error_code = health.error_code, "device health");
        Ok(health)
    }

    fn device_info(&mut self, timeout: Duration) -> Result<DeviceInfo> {
        let answer = self.query(CMD_GET_DEVICE_INFO, &[], ANS_TYPE_DEVINFO, timeout)?;
        let info = DeviceInfo::decode(&answer)?;
        debug!(
            model = info.model,
            firmware = %info.firmware_string(),
            hardware = info.hardware_version,
            "device info"
        );
        Ok(info)
    }

    fn set_motor_pwm(&mut self, pwm: u16) -> Result<()> {
        debug!(pwm, "setting motor PWM");
        self.send(CMD_SET_MOTOR_PWM, &pwm.to_le_bytes())
    }

    fn set_spin_speed(&mut self, rpm: u16, timeout: Duration) -> Result<()> {
        if !self.check_is_tof(timeout)? {
            return Err(DriverError::NotSupported(
                "spin speed control requires a time-of-flight device".into(),
            ));
        }
        debug!(rpm, "setting spin speed");
        self.send(CMD_HQ_MOTOR_SPEED_CTRL, &rpm.to_le_bytes())
    }

    fn start_motor(&mut self) -> Result<()> {
        self.set_motor(true)
    }

    fn stop_motor(&mut self) -> Result<()> {
        self.set_motor(false)
    }

    fn check_motor_ctrl_support(&mut self, timeout: Duration) -> Result<bool> {
        let answer = self.query(
            CMD_GET_ACC_BOARD_FLAG,
            &0u32.to_le_bytes(),
            ANS_TYPE_ACC_BOARD_FLAG,
            timeout,
        )?;
        let supported = conf_u32(&answer)? & ACC_BOARD_FLAG_MOTOR_CTRL != 0;
        self.motor_ctrl = Some(supported);
        Ok(supported)
    }

    fn check_is_tof(&mut self, timeout: Duration) -> Result<bool> {
        Ok(self.device_info(timeout)?.is_tof())
    }

    fn supported_scan_modes(&mut self, timeout: Duration) -> Result<Vec<ScanMode>> {
        if self.supports_lidar_conf(timeout)? {
            let count = conf_u16(&self.conf(CONF_SCAN_MODE_COUNT, None, timeout)?)?;
            return (0..count).map(|id| self.scan_mode(id, timeout)).collect();
        }

        let rate = self.sample_rate(timeout)?;
        Ok(vec![
            ScanMode {
                id: LEGACY_MODE_STANDARD,
                us_per_sample: f32::from(rate.standard_us),
                max_distance: LEGACY_MAX_DISTANCE,
                ans_type: ANS_TYPE_MEASUREMENT,
                name: "Standard".to_string(),
            },
            ScanMode {
                id: LEGACY_MODE_EXPRESS,
                us_per_sample: f32::from(rate.express_us),
                max_distance: LEGACY_MAX_DISTANCE,
                ans_type: ANS_TYPE_MEASUREMENT_CAPSULED,
                name: "Express".to_string(),
            },
        ])
    }

    fn typical_scan_mode(&mut self, timeout: Duration) -> Result<u16> {
        if !self.supports_lidar_conf(timeout)? {
            return Ok(LEGACY_MODE_EXPRESS);
        }
        Ok(conf_u16(&self.conf(CONF_SCAN_MODE_TYPICAL, None, timeout)?)?)
    }

    fn start_scan_normal(&mut self, force: bool, timeout: Duration) -> Result<()> {
        let cmd = if force { CMD_FORCE_SCAN } else { CMD_SCAN };
        self.begin_scan(cmd, &[], ANS_TYPE_MEASUREMENT, ScanFormat::Standard, timeout)
    }

    fn start_scan_express(
        &mut self,
        force: bool,
        mode_id: u16,
        options: u32,
        timeout: Duration,
    ) -> Result<ScanMode> {
        let mode = self
            .supported_scan_modes(timeout)?
            .into_iter()
            .find(|mode| mode.id == mode_id)
            .ok_or_else(|| DriverError::NotSupported(format!("scan mode {mode_id}")))?;
        debug!(mode = %mode.name, options, "starting scan");

        match ScanFormat::for_answer(mode.ans_type) {
            Some(ScanFormat::Standard) => self.start_scan_normal(force, timeout)?,
            Some(format @ ScanFormat::Capsule(_)) => {
                let working_mode = if self.lidar_conf == Some(true) {
                    mode_id as u8
                } else {
                    LEGACY_EXPRESS_WORKING_MODE
                };
                // working mode, work flags (u16), reserved (u16)
                let payload = [working_mode, 0, 0, 0, 0];
                self.begin_scan(CMD_EXPRESS_SCAN, &payload, mode.ans_type, format, timeout)?;
            }
            None => return Err(DriverError::FormatNotSupported(mode.ans_type)),
        }
        Ok(mode)
    }

    fn stop(&mut self, _timeout: Duration) -> Result<()> {
        self.halt_scan()?;
        self.send(CMD_STOP, &[])?;
        if let Some(reader) = self.link()?.reader.as_mut() {
            reader.clear_buffer();
        }
        info!("scan stopped");
        Ok(())
    }

    fn grab_scan_data(
        &mut self,
        nodes: &mut [MeasurementNode],
        timeout: Duration,
    ) -> Result<usize> {
        if self.worker.is_none() {
            return Err(DriverError::OperationFailed("not scanning".into()));
        }
        let count = self.cache.wait_scan(nodes, timeout)?;
        debug!(count, capacity = nodes.len(), "grabbed rotation");
        Ok(count)
    }

    fn scan_data_with_interval(&mut self, nodes: &mut [MeasurementNode]) -> Result<usize> {
        if self.worker.is_none() {
            return Err(DriverError::OperationFailed("not scanning".into()));
        }
        Ok(self.cache.drain_interval(nodes))
    }
}

impl<C: Channel> Drop for SerialLidarDriver<C> {
    fn drop(&mut self) {
        let _ = self.halt_scan();
    }
}
