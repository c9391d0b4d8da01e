use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bclidar_driver::LidarDriver;
use tracing::info;

use crate::cmd::{close_device, done, open_device, parse_timeout, Device, ScanArgs};
use crate::exit::{driver_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_rotation, LineKind, OutputFormat};

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.device.timeout)?;
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut device = open_device(&args.device)?;
    let result = stream(&mut device, &args, timeout, &running, format);
    close_device(device);
    result
}

fn stream(
    device: &mut Device,
    args: &ScanArgs,
    timeout: Duration,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<i32> {
    let mode = match args.mode {
        Some(mode) => mode,
        None => typical_mode(device, timeout)?,
    };

    done(device.start_motor(), "start motor failed")?;
    let selected = done(device.start_scan(false, mode, 0), "start scan failed")?;
    info!(mode = selected.id, name = %selected.name, "scanning");

    let kind = if args.lines {
        LineKind::AngleDistance
    } else {
        LineKind::Sentence
    };

    let mut rotations = 0usize;
    while running.load(Ordering::SeqCst) && args.count.map_or(true, |count| rotations < count) {
        let lines = match kind {
            LineKind::AngleDistance => done(device.string_data(timeout), "grab scan data failed")?,
            LineKind::Sentence => done(
                device.nmea_sentences(args.sensor_id, timeout),
                "grab scan data failed",
            )?,
        };
        rotations = rotations.saturating_add(1);
        print_rotation(rotations, &lines, kind, format);
    }

    Ok(SUCCESS)
}

fn typical_mode(device: &mut Device, timeout: Duration) -> CliResult<u16> {
    device
        .driver_mut()
        .ok_or_else(|| CliError::new(INTERNAL, "driver is not initialized"))?
        .typical_scan_mode(timeout)
        .map_err(|err| driver_error("typical scan mode failed", err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
