use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{PrinterId, UserId},
    error::{ApiRejection, ErrorBody},
    protocol::{
        CreateUserRequest, DiscoveredDevice, MessageResponse, PrinterRecord, PrinterUpdate,
        ProvisionRequest, ProvisionResponse, ScanRequest, ScanResponse, UserRecord,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Rejected(#[from] ApiRejection),
    #[error("inventory service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid inventory service url '{0}'")]
    InvalidUrl(String),
}

impl BackendError {
    /// Message suitable for the activity log: the service's own `detail`
    /// when it sent one.
    pub fn reason(&self) -> String {
        match self {
            Self::Rejected(rejection) => rejection.detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Operations of the inventory service the console depends on.
#[async_trait]
pub trait FleetBackend: Send + Sync {
    async fn scan_devices(&self, ip_range: &str) -> Result<Vec<DiscoveredDevice>, BackendError>;
    async fn register_devices(
        &self,
        devices: &[DiscoveredDevice],
    ) -> Result<MessageResponse, BackendError>;
    async fn fetch_devices(&self) -> Result<Vec<PrinterRecord>, BackendError>;
    async fn create_user(&self, request: &CreateUserRequest) -> Result<UserRecord, BackendError>;
    async fn provision_user(
        &self,
        user_id: UserId,
        printer_ids: &[PrinterId],
    ) -> Result<ProvisionResponse, BackendError>;
    async fn refresh_device_snmp(
        &self,
        printer_id: PrinterId,
    ) -> Result<MessageResponse, BackendError>;
    async fn update_device(
        &self,
        printer_id: PrinterId,
        update: &PrinterUpdate,
    ) -> Result<PrinterRecord, BackendError>;
}

/// JSON-over-HTTP client for the inventory service.
pub struct HttpFleetBackend {
    http: Client,
    api_url: String,
}

impl HttpFleetBackend {
    pub fn new(api_url: &str) -> Result<Self, BackendError> {
        Self::with_timeout(api_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let api_url = normalize_api_url(api_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, api_url })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// WebSocket endpoint streaming the service's activity log.
    pub fn log_socket_url(&self) -> String {
        let ws_url = if self.api_url.starts_with("https://") {
            self.api_url.replacen("https://", "wss://", 1)
        } else {
            self.api_url.replacen("http://", "ws://", 1)
        };
        format!("{ws_url}/ws/logs")
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = ErrorBody::detail_from_body(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            warn!(status = status.as_u16(), %detail, "inventory service rejected request");
            return Err(ApiRejection::new(status.as_u16(), detail).into());
        }
        Ok(response.json().await?)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, BackendError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|_| BackendError::InvalidUrl(raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(BackendError::InvalidUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl FleetBackend for HttpFleetBackend {
    async fn scan_devices(&self, ip_range: &str) -> Result<Vec<DiscoveredDevice>, BackendError> {
        let response: ScanResponse = self
            .send_json(
                self.http
                    .post(format!("{}/discovery/scan", self.api_url))
                    .json(&ScanRequest {
                        ip_range: ip_range.to_string(),
                    }),
            )
            .await?;
        debug!(
            ip_range,
            total_scanned = response.total_scanned,
            total_found = response.total_found,
            seconds = response.scan_duration_seconds,
            "scan finished"
        );
        Ok(response.devices)
    }

    async fn register_devices(
        &self,
        devices: &[DiscoveredDevice],
    ) -> Result<MessageResponse, BackendError> {
        self.send_json(
            self.http
                .post(format!("{}/discovery/register-discovered", self.api_url))
                .json(devices),
        )
        .await
    }

    async fn fetch_devices(&self) -> Result<Vec<PrinterRecord>, BackendError> {
        self.send_json(self.http.get(format!("{}/printers/", self.api_url)))
            .await
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<UserRecord, BackendError> {
        self.send_json(
            self.http
                .post(format!("{}/users/", self.api_url))
                .json(request),
        )
        .await
    }

    async fn provision_user(
        &self,
        user_id: UserId,
        printer_ids: &[PrinterId],
    ) -> Result<ProvisionResponse, BackendError> {
        self.send_json(
            self.http
                .post(format!("{}/provisioning/provision", self.api_url))
                .json(&ProvisionRequest {
                    user_id,
                    printer_ids: printer_ids.to_vec(),
                }),
        )
        .await
    }

    async fn refresh_device_snmp(
        &self,
        printer_id: PrinterId,
    ) -> Result<MessageResponse, BackendError> {
        self.send_json(self.http.post(format!(
            "{}/discovery/refresh-snmp/{}",
            self.api_url, printer_id.0
        )))
        .await
    }

    async fn update_device(
        &self,
        printer_id: PrinterId,
        update: &PrinterUpdate,
    ) -> Result<PrinterRecord, BackendError> {
        self.send_json(
            self.http
                .put(format!("{}/printers/{}", self.api_url, printer_id.0))
                .json(update),
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
