use std::io::IsTerminal;

use bclidar_protocol::parse_sentence;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// How the lines of a rotation are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Sentence,
    AngleDistance,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

#[derive(Serialize)]
struct RotationOutput<'a> {
    rotation: usize,
    count: usize,
    lines: &'a [String],
}

pub fn print_rotation(rotation: usize, lines: &[String], kind: LineKind, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RotationOutput {
            rotation,
            count: lines.len(),
            lines,
        }),
        OutputFormat::Table => println!("{}", rotation_table(lines, kind)),
        OutputFormat::Pretty => {
            println!("rotation={rotation} count={}", lines.len());
            for line in lines {
                println!("  {line}");
            }
        }
        OutputFormat::Raw => {
            for line in lines {
                println!("{line}");
            }
        }
    }
}

fn rotation_table(lines: &[String], kind: LineKind) -> Table {
    match kind {
        LineKind::Sentence => {
            let mut table = new_table(["SENSOR", "SYNC", "ANGLE", "DISTANCE", "QUALITY"]);
            for line in lines {
                match parse_sentence(line) {
                    Ok(s) => table.add_row(vec![
                        s.sensor_id.to_string(),
                        if s.sync { "S" } else { "N" }.to_string(),
                        format!("{:.2}", s.angle),
                        format!("{:.2}", s.distance),
                        s.quality.to_string(),
                    ]),
                    Err(err) => table.add_row(vec![format!("<{err}>")]),
                };
            }
            table
        }
        LineKind::AngleDistance => {
            let mut table = new_table(["ANGLE", "DISTANCE"]);
            for line in lines {
                let (angle, distance) = line.split_once(';').unwrap_or((line.as_str(), ""));
                table.add_row(vec![angle, distance]);
            }
            table
        }
    }
}
