use serde::{Deserialize, Serialize};
use shared::{
    domain::{Capabilities, DeviceStatus, PrinterId, TonerLevels},
    protocol::PrinterRecord,
};

/// Device as the inventory may report it. Only the identity and addressing
/// fields are guaranteed; everything else is absent until the printer has
/// been polled at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    pub id: String,
    pub hostname: String,
    pub ip_address: String,
    pub status: Option<DeviceStatus>,
    pub location: Option<String>,
    pub toner_levels: Option<TonerReadings>,
    pub capabilities: Option<Capabilities>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TonerReadings {
    pub cyan: Option<i64>,
    pub magenta: Option<i64>,
    pub yellow: Option<i64>,
    pub black: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub hostname: String,
    pub ip_address: String,
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub toner_levels: TonerLevels,
    pub capabilities: Capabilities,
}

impl Device {
    /// Numeric identifier the inventory service knows this device by.
    pub fn backend_id(&self) -> Option<PrinterId> {
        self.id.trim().parse::<i64>().ok().map(PrinterId)
    }
}

impl From<PrinterRecord> for DeviceRecord {
    fn from(record: PrinterRecord) -> Self {
        let toner = [
            record.toner_cyan,
            record.toner_magenta,
            record.toner_yellow,
            record.toner_black,
        ];
        let toner_levels = toner.iter().any(Option::is_some).then_some(TonerReadings {
            cyan: record.toner_cyan,
            magenta: record.toner_magenta,
            yellow: record.toner_yellow,
            black: record.toner_black,
        });
        let capabilities = (record.has_color.is_some() || record.has_scanner.is_some()).then(|| {
            Capabilities {
                color: record.has_color.unwrap_or(false),
                scanner: record.has_scanner.unwrap_or(false),
            }
        });

        Self {
            id: record.id.0.to_string(),
            hostname: record.hostname,
            ip_address: record.ip_address,
            status: record.status.as_deref().map(DeviceStatus::from_wire),
            location: record.location,
            toner_levels,
            capabilities,
        }
    }
}

/// Fills every optional field of `record` with its display default. Never
/// fails: a missing status reads as offline, missing toner as empty.
pub fn normalize_device(record: DeviceRecord) -> Device {
    let toner = record.toner_levels.unwrap_or_default();
    Device {
        id: record.id,
        hostname: record.hostname,
        ip_address: record.ip_address,
        status: record.status.unwrap_or_default(),
        location: record.location,
        toner_levels: TonerLevels {
            cyan: toner_percent(toner.cyan),
            magenta: toner_percent(toner.magenta),
            yellow: toner_percent(toner.yellow),
            black: toner_percent(toner.black),
        },
        capabilities: record.capabilities.unwrap_or_default(),
    }
}

fn toner_percent(reading: Option<i64>) -> u8 {
    // clamp() keeps the conversion lossless
    reading.unwrap_or(0).clamp(0, 100) as u8
}

/// Compact projection used when listing the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCard {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub status: DeviceStatus,
    pub location: Option<String>,
    pub toner: [u8; 4],
}

impl From<&Device> for DeviceCard {
    fn from(device: &Device) -> Self {
        let toner = device.toner_levels;
        Self {
            id: device.id.clone(),
            name: device.hostname.clone(),
            ip: device.ip_address.clone(),
            status: device.status,
            location: device.location.clone(),
            toner: [toner.cyan, toner.magenta, toner.yellow, toner.black],
        }
    }
}
