use std::time::Duration;

use bclidar_driver::{
    DeviceResult, DriverConfig, LidarDevice, SerialLidarDriver, DEFAULT_BAUD_RATE,
};
use clap::{Args, Subcommand};
use tracing::warn;

use crate::exit::{device_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod modes;
pub mod ports;
pub mod scan;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Print device info, health and capabilities.
    Info(InfoArgs),
    /// List the scan modes the device supports.
    Modes(ModesArgs),
    /// Stream rotations as sentences or angle;distance lines.
    Scan(ScanArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Modes(args) => modes::run(args, format),
        Command::Scan(args) => scan::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial connection settings shared by device commands.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Serial port the lidar is attached to (e.g. /dev/ttyUSB0, COM3).
    #[arg(env = "BCLIDAR_PORT")]
    pub port: String,
    /// Baud rate.
    #[arg(long, env = "BCLIDAR_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Per-request timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct ModesArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Scan mode id. Default: the device's typical mode.
    #[arg(long)]
    pub mode: Option<u16>,
    /// Exit after N rotations.
    #[arg(long)]
    pub count: Option<usize>,
    /// Sensor id embedded in each sentence.
    #[arg(long, default_value_t = 1)]
    pub sensor_id: u32,
    /// Print `angle;distance` lines instead of sentences.
    #[arg(long)]
    pub lines: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) type Device = LidarDevice<SerialLidarDriver>;

/// Create a device and connect it to `args.port`.
pub(crate) fn open_device(args: &DeviceArgs) -> CliResult<Device> {
    let mut device = LidarDevice::new(|| Ok(SerialLidarDriver::new(DriverConfig::default())));
    device
        .initialize()
        .map_err(|err| device_error("initialize failed", err))?;
    done(
        device.connect(&args.port, args.baud, 0),
        &format!("connect to {} failed", args.port),
    )?;
    Ok(device)
}

/// Stop scanning and the motor and release the port.
pub(crate) fn close_device(mut device: Device) {
    if let Err(err) = device.dispose() {
        warn!(error = %err, "device did not shut down cleanly");
    }
}

/// Unwrap a device call made on a connected device.
pub(crate) fn done<T>(result: DeviceResult<T>, context: &str) -> CliResult<T> {
    result
        .map_err(|err| device_error(context, err))?
        .done()
        .ok_or_else(|| CliError::new(INTERNAL, format!("{context}: device is not connected")))
}

pub(crate) fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
