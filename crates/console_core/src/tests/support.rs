//! Recording fake of the inventory service plus fixture builders shared by
//! the unit test modules.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{Capabilities, DeviceStatus, PrinterId, TonerLevels, UserId},
    error::ApiRejection,
    protocol::{
        AvailableFunctions, CreateUserRequest, DiscoveredDevice, MessageResponse,
        NetworkCredentials, PrinterRecord, PrinterUpdate, ProvisionResponse, SmbConfig,
        UserRecord,
    },
};
use tokio::sync::{Mutex, Notify};

use crate::{
    backend::{BackendError, FleetBackend},
    transform::Device,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendCall {
    Scan(String),
    Register(Vec<DiscoveredDevice>),
    FetchDevices,
    CreateUser(CreateUserRequest),
    Provision {
        user_id: UserId,
        printer_ids: Vec<PrinterId>,
    },
    RefreshSnmp(PrinterId),
    Update(PrinterId, PrinterUpdate),
}

impl BackendCall {
    pub(crate) fn is_provision(&self) -> bool {
        matches!(self, Self::Provision { .. })
    }
}

fn rejected(detail: &str) -> BackendError {
    ApiRejection::new(500, detail).into()
}

pub(crate) struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    scan: Result<Vec<DiscoveredDevice>, String>,
    printers: Mutex<Result<Vec<PrinterRecord>, String>>,
    register_error: Option<String>,
    create_user_error: Option<String>,
    create_user_gate: Option<Arc<Notify>>,
    provision_error: Option<String>,
    refresh: Result<MessageResponse, String>,
    update_error: Option<String>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            scan: Ok(Vec::new()),
            printers: Mutex::new(Ok(Vec::new())),
            register_error: None,
            create_user_error: None,
            create_user_gate: None,
            provision_error: None,
            refresh: Ok(MessageResponse {
                success: true,
                message: "Printer data refreshed".into(),
            }),
            update_error: None,
        }
    }

    pub(crate) fn with_scan(mut self, devices: Vec<DiscoveredDevice>) -> Self {
        self.scan = Ok(devices);
        self
    }

    pub(crate) fn failing_scan(mut self, detail: &str) -> Self {
        self.scan = Err(detail.to_string());
        self
    }

    pub(crate) fn with_printers(self, printers: Vec<PrinterRecord>) -> Self {
        Self {
            printers: Mutex::new(Ok(printers)),
            ..self
        }
    }

    pub(crate) fn failing_fetch(self, detail: &str) -> Self {
        Self {
            printers: Mutex::new(Err(detail.to_string())),
            ..self
        }
    }

    pub(crate) fn failing_register(mut self, detail: &str) -> Self {
        self.register_error = Some(detail.to_string());
        self
    }

    pub(crate) fn failing_create_user(mut self, detail: &str) -> Self {
        self.create_user_error = Some(detail.to_string());
        self
    }

    /// User creation is recorded, then waits for `gate` before answering.
    pub(crate) fn pausing_create_user(mut self, gate: Arc<Notify>) -> Self {
        self.create_user_gate = Some(gate);
        self
    }

    pub(crate) fn failing_provision(mut self, detail: &str) -> Self {
        self.provision_error = Some(detail.to_string());
        self
    }

    pub(crate) fn with_refresh(mut self, refresh: Result<MessageResponse, String>) -> Self {
        self.refresh = refresh;
        self
    }

    pub(crate) fn failing_update(mut self, detail: &str) -> Self {
        self.update_error = Some(detail.to_string());
        self
    }

    pub(crate) async fn set_printers(&self, printers: Vec<PrinterRecord>) {
        *self.printers.lock().await = Ok(printers);
    }

    pub(crate) async fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: BackendCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl FleetBackend for RecordingBackend {
    async fn scan_devices(&self, ip_range: &str) -> Result<Vec<DiscoveredDevice>, BackendError> {
        self.record(BackendCall::Scan(ip_range.to_string())).await;
        self.scan.clone().map_err(|detail| rejected(&detail))
    }

    async fn register_devices(
        &self,
        devices: &[DiscoveredDevice],
    ) -> Result<MessageResponse, BackendError> {
        self.record(BackendCall::Register(devices.to_vec())).await;
        if let Some(detail) = &self.register_error {
            return Err(rejected(detail));
        }
        Ok(MessageResponse {
            success: true,
            message: format!("Registered {} printer(s), skipped 0 existing", devices.len()),
        })
    }

    async fn fetch_devices(&self) -> Result<Vec<PrinterRecord>, BackendError> {
        self.record(BackendCall::FetchDevices).await;
        self.printers
            .lock()
            .await
            .clone()
            .map_err(|detail| rejected(&detail))
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<UserRecord, BackendError> {
        self.record(BackendCall::CreateUser(request.clone())).await;
        if let Some(gate) = &self.create_user_gate {
            gate.notified().await;
        }
        if let Some(detail) = &self.create_user_error {
            return Err(rejected(detail));
        }
        Ok(UserRecord {
            id: UserId(31),
            name: request.name.clone(),
        })
    }

    async fn provision_user(
        &self,
        user_id: UserId,
        printer_ids: &[PrinterId],
    ) -> Result<ProvisionResponse, BackendError> {
        self.record(BackendCall::Provision {
            user_id,
            printer_ids: printer_ids.to_vec(),
        })
        .await;
        if let Some(detail) = &self.provision_error {
            return Err(rejected(detail));
        }
        Ok(ProvisionResponse {
            success: true,
            message: format!("User provisioned to {} printer(s)", printer_ids.len()),
            printers_provisioned: printer_ids.len(),
            printer_ids: printer_ids.to_vec(),
        })
    }

    async fn refresh_device_snmp(
        &self,
        printer_id: PrinterId,
    ) -> Result<MessageResponse, BackendError> {
        self.record(BackendCall::RefreshSnmp(printer_id)).await;
        self.refresh.clone().map_err(|detail| rejected(&detail))
    }

    async fn update_device(
        &self,
        printer_id: PrinterId,
        update: &PrinterUpdate,
    ) -> Result<PrinterRecord, BackendError> {
        self.record(BackendCall::Update(printer_id, update.clone()))
            .await;
        if let Some(detail) = &self.update_error {
            return Err(rejected(detail));
        }
        let mut record = printer_record(printer_id.0, "updated", "10.0.0.1");
        record.hostname = update.hostname.clone().unwrap_or(record.hostname);
        record.location = update.location.clone();
        Ok(record)
    }
}

pub(crate) fn device(id: &str, hostname: &str) -> Device {
    Device {
        id: id.to_string(),
        hostname: hostname.to_string(),
        ip_address: format!("10.0.0.{}", hostname.len()),
        status: DeviceStatus::Online,
        location: None,
        toner_levels: TonerLevels::default(),
        capabilities: Capabilities::default(),
    }
}

pub(crate) fn printer_record(id: i64, hostname: &str, ip_address: &str) -> PrinterRecord {
    PrinterRecord {
        id: PrinterId(id),
        hostname: hostname.to_string(),
        ip_address: ip_address.to_string(),
        status: Some("online".into()),
        location: None,
        detected_model: None,
        toner_cyan: Some(50),
        toner_magenta: Some(50),
        toner_yellow: Some(50),
        toner_black: Some(50),
        has_color: Some(true),
        has_scanner: Some(true),
    }
}

pub(crate) fn discovered(hostname: &str, ip_address: &str) -> DiscoveredDevice {
    DiscoveredDevice {
        hostname: hostname.to_string(),
        ip_address: ip_address.to_string(),
        status: "online".into(),
        detected_model: Some("IM C3000".into()),
        has_color: true,
        has_scanner: true,
        has_fax: false,
        toner_cyan: 30,
        toner_magenta: 40,
        toner_yellow: 50,
        toner_black: 60,
        location: None,
    }
}

pub(crate) fn create_user_request(name: &str) -> CreateUserRequest {
    CreateUserRequest {
        name: name.to_string(),
        pin: "1234".into(),
        network_credentials: NetworkCredentials {
            username: "corp\\scanner".into(),
            password: "secret".into(),
        },
        smb_config: SmbConfig {
            server: "10.0.0.5".into(),
            port: 21,
            path: "\\\\10.0.0.5\\scans".into(),
        },
        available_functions: AvailableFunctions {
            scanner: true,
            ..AvailableFunctions::default()
        },
    }
}
