use bclidar_transport::{list_ports, PortDescription};
use serde::Serialize;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct PortOutput {
    name: String,
    kind: &'static str,
    usb_id: Option<String>,
    product: Option<String>,
}

impl From<PortDescription> for PortOutput {
    fn from(port: PortDescription) -> Self {
        Self {
            name: port.name,
            kind: port.kind,
            usb_id: port
                .usb_id
                .map(|(vid, pid)| format!("{vid:04x}:{pid:04x}")),
            product: port.product,
        }
    }
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports: Vec<PortOutput> = list_ports()
        .map_err(|err| transport_error("list ports failed", err))?
        .into_iter()
        .map(PortOutput::from)
        .collect();

    match format {
        OutputFormat::Json => print_json(&ports),
        OutputFormat::Table => {
            let mut table = new_table(["PORT", "TYPE", "USB ID", "PRODUCT"]);
            for port in &ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.usb_id.clone().unwrap_or_default(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in &ports {
                match &port.usb_id {
                    Some(id) => println!("{} ({}, {id})", port.name, port.kind),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
        OutputFormat::Raw => {
            for port in &ports {
                println!("{}", port.name);
            }
        }
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_id_is_hex_pair() {
        let out = PortOutput::from(PortDescription {
            name: "/dev/ttyUSB0".into(),
            kind: "usb",
            usb_id: Some((0x10c4, 0xea60)),
            product: Some("CP2102".into()),
        });
        assert_eq!(out.usb_id.as_deref(), Some("10c4:ea60"));
    }
}
