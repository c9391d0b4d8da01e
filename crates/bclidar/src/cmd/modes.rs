use std::time::Duration;

use bclidar_driver::{LidarDriver, ScanMode};
use bclidar_protocol::command::answer_name;
use serde::Serialize;

use crate::cmd::{close_device, open_device, parse_timeout, Device, ModesArgs};
use crate::exit::{driver_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct ModesOutput {
    port: String,
    typical: u16,
    modes: Vec<ScanMode>,
}

pub fn run(args: ModesArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.device.timeout)?;
    let mut device = open_device(&args.device)?;
    let result = query(&mut device, timeout);
    close_device(device);

    let (typical, modes) = result?;
    print_modes(
        &ModesOutput {
            port: args.device.port,
            typical,
            modes,
        },
        format,
    );
    Ok(SUCCESS)
}

/// Typical mode id and every supported mode.
pub(crate) fn query(device: &mut Device, timeout: Duration) -> CliResult<(u16, Vec<ScanMode>)> {
    let driver = device
        .driver_mut()
        .ok_or_else(|| CliError::new(INTERNAL, "driver is not initialized"))?;
    let modes = driver
        .supported_scan_modes(timeout)
        .map_err(|err| driver_error("list scan modes failed", err))?;
    let typical = driver
        .typical_scan_mode(timeout)
        .map_err(|err| driver_error("typical scan mode failed", err))?;
    Ok((typical, modes))
}

fn print_modes(out: &ModesOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(["ID", "NAME", "US/SAMPLE", "MAX DIST (m)", "ANSWER", ""]);
            for mode in &out.modes {
                table.add_row(vec![
                    mode.id.to_string(),
                    mode.name.clone(),
                    format!("{:.2}", mode.us_per_sample),
                    format!("{:.1}", mode.max_distance),
                    answer_name(mode.ans_type).to_string(),
                    typical_marker(out.typical, mode).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for mode in &out.modes {
                println!(
                    "{:>3} {:<12} {:>7.2}us {:>5.1}m {} {}",
                    mode.id,
                    mode.name,
                    mode.us_per_sample,
                    mode.max_distance,
                    answer_name(mode.ans_type),
                    typical_marker(out.typical, mode)
                );
            }
        }
        OutputFormat::Raw => {
            for mode in &out.modes {
                println!("{}", mode.id);
            }
        }
    }
}

fn typical_marker(typical: u16, mode: &ScanMode) -> &'static str {
    if mode.id == typical {
        "typical"
    } else {
        ""
    }
}
