use std::time::Duration;

use bclidar_driver::{DeviceHealth, DeviceInfo};
use serde::Serialize;

use crate::cmd::{close_device, done, open_device, parse_timeout, Device, InfoArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    port: String,
    model: u8,
    firmware: String,
    hardware: u8,
    serial_number: String,
    health: String,
    health_error_code: u16,
    is_tof: bool,
    motor_control: bool,
}

impl InfoOutput {
    fn new(
        port: &str,
        info: &DeviceInfo,
        health: &DeviceHealth,
        is_tof: bool,
        motor_control: bool,
    ) -> Self {
        Self {
            port: port.to_string(),
            model: info.model,
            firmware: info.firmware_string(),
            hardware: info.hardware_version,
            serial_number: info.serial_hex(),
            health: health.status().to_string(),
            health_error_code: health.error_code,
            is_tof,
            motor_control,
        }
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.device.timeout)?;
    let mut device = open_device(&args.device)?;
    let result = query(&mut device, &args.device.port, timeout);
    close_device(device);

    print_info(&result?, format);
    Ok(SUCCESS)
}

fn query(device: &mut Device, port: &str, timeout: Duration) -> CliResult<InfoOutput> {
    let info = done(device.device_info(timeout), "get device info failed")?;
    let health = done(device.health(timeout), "get health failed")?;
    let is_tof = done(device.check_is_tof(timeout), "tof check failed")?;
    let motor_control = done(
        device.check_motor_ctrl_support(timeout),
        "motor control check failed",
    )?;
    Ok(InfoOutput::new(port, &info, &health, is_tof, motor_control))
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(["FIELD", "VALUE"]);
            table
                .add_row(vec!["port".to_string(), out.port.clone()])
                .add_row(vec!["model".to_string(), out.model.to_string()])
                .add_row(vec!["firmware".to_string(), out.firmware.clone()])
                .add_row(vec!["hardware".to_string(), out.hardware.to_string()])
                .add_row(vec!["serial".to_string(), out.serial_number.clone()])
                .add_row(vec![
                    "health".to_string(),
                    format!("{} ({:#06x})", out.health, out.health_error_code),
                ])
                .add_row(vec!["tof".to_string(), out.is_tof.to_string()])
                .add_row(vec!["motor control".to_string(), out.motor_control.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Device Info:");
            println!("  Port:          {}", out.port);
            println!("  Model:         {}", out.model);
            println!("  Firmware:      {}", out.firmware);
            println!("  Hardware:      {}", out.hardware);
            println!("  Serial:        {}", out.serial_number);
            println!(
                "  Health:        {} (error code {:#06x})",
                out.health, out.health_error_code
            );
            println!("  Time of flight: {}", out.is_tof);
            println!("  Motor control: {}", out.motor_control);
        }
        OutputFormat::Raw => println!("{}", out.serial_number),
    }
}
