use serde::{Deserialize, Serialize};

use crate::domain::{LogLevel, PrinterId, UserId};

/// Printer row as stored by the inventory service. Freshly discovered
/// printers that were never polled may come back with most fields missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterRecord {
    pub id: PrinterId,
    pub hostname: String,
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toner_cyan: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toner_magenta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toner_yellow: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toner_black: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_scanner: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrinterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub ip_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub devices: Vec<DiscoveredDevice>,
    #[serde(default)]
    pub total_scanned: u64,
    #[serde(default)]
    pub total_found: u64,
    #[serde(default)]
    pub scan_duration_seconds: f64,
}

/// A printer answering on the scanned range. The same shape is posted back
/// when the operator registers it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredDevice {
    pub hostname: String,
    pub ip_address: String,
    #[serde(default = "default_discovered_status")]
    pub status: String,
    #[serde(default)]
    pub detected_model: Option<String>,
    #[serde(default)]
    pub has_color: bool,
    #[serde(default)]
    pub has_scanner: bool,
    #[serde(default)]
    pub has_fax: bool,
    #[serde(default)]
    pub toner_cyan: i64,
    #[serde(default)]
    pub toner_magenta: i64,
    #[serde(default)]
    pub toner_yellow: i64,
    #[serde(default)]
    pub toner_black: i64,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_discovered_status() -> String {
    "offline".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmbConfig {
    pub server: String,
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableFunctions {
    pub copier: bool,
    pub copier_color: bool,
    pub printer: bool,
    pub printer_color: bool,
    pub document_server: bool,
    pub fax: bool,
    pub scanner: bool,
    pub browser: bool,
}

impl AvailableFunctions {
    /// Colour variants only refine copier/printer and do not count as a
    /// function on their own.
    pub fn any_enabled(&self) -> bool {
        self.copier
            || self.printer
            || self.document_server
            || self.fax
            || self.scanner
            || self.browser
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(rename = "codigo_de_usuario")]
    pub pin: String,
    pub network_credentials: NetworkCredentials,
    pub smb_config: SmbConfig,
    pub available_functions: AvailableFunctions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub user_id: UserId,
    pub printer_ids: Vec<PrinterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionResponse {
    #[serde(default)]
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub printers_provisioned: usize,
    #[serde(default)]
    pub printer_ids: Vec<PrinterId>,
}

/// Frame pushed on the activity log socket. The service also sends `id` and
/// `timestamp`; the console stamps its own and ignores them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEvent {
    pub message: String,
    #[serde(default, rename = "type")]
    pub level: LogLevel,
}
