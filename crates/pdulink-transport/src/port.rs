use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::SerialStream;

/// What kind of physical interface backs a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

/// One enumerated serial interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Device path (`/dev/ttyUSB0`, `COM3`, ...).
    pub name: String,
    pub kind: PortKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

impl PortInfo {
    /// A port known only by its device path.
    pub fn from_path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Unknown,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }

    /// Case-insensitive substring match against every descriptive field.
    ///
    /// The kind participates too, so the pattern `usb` selects the first
    /// USB-attached adapter even when its device path says `ttyACM0`.
    pub fn matches(&self, pattern: &str) -> bool {
        let needle = pattern.to_lowercase();
        let kind = match self.kind {
            PortKind::Usb => Some("usb"),
            PortKind::Pci => Some("pci"),
            PortKind::Bluetooth => Some("bluetooth"),
            PortKind::Unknown => None,
        };
        std::iter::once(Some(self.name.as_str()))
            .chain([
                kind,
                self.manufacturer.as_deref(),
                self.product.as_deref(),
                self.serial_number.as_deref(),
            ])
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let mut port = PortInfo::from_path(info.port_name);
        match info.port_type {
            SerialPortType::UsbPort(usb) => {
                port.kind = PortKind::Usb;
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
                port.manufacturer = usb.manufacturer;
                port.product = usb.product;
                port.serial_number = usb.serial_number;
            }
            SerialPortType::PciPort => port.kind = PortKind::Pci,
            SerialPortType::BluetoothPort => port.kind = PortKind::Bluetooth,
            SerialPortType::Unknown => {}
        }
        port
    }
}

/// Enumerate the serial interfaces present on this host.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports.into_iter().map(PortInfo::from).collect())
}

/// Pick the first port in `ports` matching `pattern`.
///
/// Fails with [`TransportError::NoMatchingPort`] rather than falling back
/// to some other interface.
pub fn select_from(pattern: &str, ports: &[PortInfo]) -> Result<PortInfo> {
    ports
        .iter()
        .find(|port| port.matches(pattern))
        .cloned()
        .ok_or_else(|| TransportError::NoMatchingPort {
            pattern: pattern.to_string(),
            available: ports.iter().map(|port| port.name.clone()).collect(),
        })
}

/// Resolve `pattern` to a single port.
///
/// A pattern naming an existing device node is used as-is, which covers
/// pseudo terminals that never show up in enumeration. Anything else is
/// matched against [`available_ports`].
pub fn select_port(pattern: &str) -> Result<PortInfo> {
    if Path::new(pattern).exists() {
        debug!(port = pattern, "using explicit device path");
        return Ok(PortInfo::from_path(pattern));
    }
    let ports = available_ports()?;
    select_from(pattern, &ports)
}

/// Serial port opener.
///
/// Resolves an identifier with [`select_port`] and opens it with 8N1
/// framing and no flow control, which is what the PDU firmware speaks.
pub struct SerialLink;

impl SerialLink {
    /// Default read timeout; bounds how long a blocked read ignores a stop request.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// Open the port matching `identifier` at `baud`.
    pub fn open(identifier: &str, baud: u32) -> Result<SerialStream> {
        Self::open_with_timeout(identifier, baud, Self::DEFAULT_READ_TIMEOUT)
    }

    /// Open the port matching `identifier` with an explicit read timeout.
    pub fn open_with_timeout(
        identifier: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<SerialStream> {
        let port = select_port(identifier)?;
        let inner = serialport::new(port.name.as_str(), baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.name.clone(),
                baud,
                source,
            })?;

        info!(port = %port.name, baud, "opened serial port");
        Ok(SerialStream::from_port(inner, port.name))
    }
}
