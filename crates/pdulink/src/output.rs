use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pdulink_link::{Command, EnvSample, LinkMessage, PowerEvent, Telemetry, CHANNELS};
use pdulink_transport::PortInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// Rail names as printed on the board silkscreen.
pub fn rail_label(rail: u32) -> &'static str {
    match rail {
        0 => "Global",
        1 => "Vibe Iso Control",
        2 => "Soldering Control",
        3 => "Pressure Sensor (reserve)",
        4 => "Soldering Heater",
        5 => "Soldering Fan",
        6 => "Pressure Sensor Main",
        7 => "Pressure Sensor Sensor",
        _ => "Spare",
    }
}

/// Supply rating of each rail.
pub fn rail_rating(rail: u32) -> &'static str {
    match rail {
        0 => "everything",
        1..=3 => "5V @ 1.5A",
        4 => "12V @ 6+A",
        5 | 6 => "12V @ 1A",
        7 => "36V @ 0.25A",
        _ => "-",
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct RailRow {
    rail: u32,
    label: &'static str,
    voltage: Option<f32>,
    current: Option<f32>,
    power: Option<f32>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageOutput<'a> {
    Telemetry {
        timestamp: String,
        rails: Vec<RailRow>,
        env: Option<EnvSample>,
    },
    Event {
        timestamp: String,
        rail: u32,
        label: &'static str,
        diagnostic: &'a str,
    },
}

/// Rails that have reported, global channel first.
fn rail_rows(telemetry: &Telemetry) -> Vec<RailRow> {
    (0..CHANNELS)
        .filter(|&slot| telemetry.voltage[slot].is_some() || telemetry.current[slot].is_some())
        .map(|slot| {
            let voltage = telemetry.voltage[slot];
            let current = telemetry.current[slot];
            RailRow {
                rail: slot as u32,
                label: rail_label(slot as u32),
                voltage,
                current,
                power: telemetry.power(slot),
            }
        })
        .collect()
}

pub fn print_message(message: &LinkMessage, format: OutputFormat) {
    match message {
        LinkMessage::Telemetry(telemetry) => print_telemetry(telemetry, format),
        LinkMessage::Event(event) => print_event(event, format),
    }
}

fn print_telemetry(telemetry: &Telemetry, format: OutputFormat) {
    let rows = rail_rows(telemetry);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput::Telemetry {
                timestamp: now_unix_seconds(),
                rails: rows,
                env: telemetry.env,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "RAIL",
                    "LABEL",
                    "RATING",
                    "VOLTAGE (V)",
                    "CURRENT (A)",
                    "POWER (W)",
                ]);
            for row in &rows {
                table.add_row(vec![
                    row.rail.to_string(),
                    row.label.to_string(),
                    rail_rating(row.rail).to_string(),
                    fmt_reading(row.voltage, 2),
                    fmt_reading(row.current, 3),
                    fmt_reading(row.power, 2),
                ]);
            }
            println!("{table}");
            if let Some(env) = telemetry.env {
                println!("{}", fmt_env(&env));
            }
        }
        OutputFormat::Pretty => {
            let rails: Vec<String> = rows
                .iter()
                .map(|row| {
                    format!(
                        "{}={}V/{}A",
                        row.rail,
                        fmt_reading(row.voltage, 2),
                        fmt_reading(row.current, 3)
                    )
                })
                .collect();
            match telemetry.env {
                Some(env) => println!("telemetry {} {}", rails.join(" "), fmt_env(&env)),
                None => println!("telemetry {}", rails.join(" ")),
            }
        }
    }
}

fn print_event(event: &PowerEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MessageOutput::Event {
            timestamp: now_unix_seconds(),
            rail: event.rail,
            label: rail_label(event.rail),
            diagnostic: &event.diagnostic,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "event rail={} ({}) {}",
            event.rail,
            rail_label(event.rail),
            event.diagnostic
        ),
    }
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ports),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "KIND", "VID:PID", "PRODUCT", "SERIAL"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    format!("{:?}", port.kind).to_lowercase(),
                    match (port.vid, port.pid) {
                        (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
                        _ => "-".to_string(),
                    },
                    port.product.clone().unwrap_or_else(|| "-".to_string()),
                    port.serial_number.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!(
                    "{} ({:?}) {}",
                    port.name,
                    port.kind,
                    port.product.as_deref().unwrap_or("")
                );
            }
        }
    }
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    port: &'a str,
    rail: u32,
    label: &'static str,
    state: &'static str,
}

pub fn print_command(command: &Command, port: &str, format: OutputFormat) {
    let out = CommandOutput {
        port,
        rail: command.rail(),
        label: rail_label(command.rail()),
        state: if command.state() { "on" } else { "off" },
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "rail {} ({}) -> {} via {}",
            out.rail, out.label, out.state, out.port
        ),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn fmt_reading(value: Option<f32>, precision: usize) -> String {
    match value {
        Some(value) => format!("{value:.precision$}"),
        None => "-".to_string(),
    }
}

fn fmt_env(env: &EnvSample) -> String {
    format!(
        "temp={:.1}C humidity={:.1}%",
        env.temperature, env.humidity
    )
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
