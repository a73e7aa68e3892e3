use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{LogLevel, PrinterId},
    protocol::{AvailableFunctions, CreateUserRequest, NetworkCredentials, SmbConfig, UserRecord},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    backend::{BackendError, FleetBackend},
    store::FleetStore,
};

/// Port the printers use to reach the scan folder share.
pub const SMB_PORT: u16 = 21;

/// Folder host used when the SMB path is not a `\\server\share` UNC path.
pub const DEFAULT_SMB_SERVER: &str = "10.0.0.5";

/// Operator input for one user provisioning job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningForm {
    pub user_name: String,
    /// User code typed on the printer panel.
    pub user_pin: String,
    pub network_username: String,
    /// Password of the scan folder account.
    pub network_password: String,
    pub smb_path: String,
    pub functions: AvailableFunctions,
}

impl Default for ProvisioningForm {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            user_pin: String::new(),
            network_username: String::new(),
            network_password: String::new(),
            smb_path: String::new(),
            functions: AvailableFunctions {
                scanner: true,
                ..AvailableFunctions::default()
            },
        }
    }
}

impl ProvisioningForm {
    pub fn with_network_username(mut self, username: impl Into<String>) -> Self {
        self.network_username = username.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Enter the user's name")]
    MissingUserName,
    #[error("Enter the user code (PIN) used on the printer panel")]
    MissingUserPin,
    #[error("Enter the scan folder password")]
    MissingFolderPassword,
    #[error("Enable at least one printer function")]
    NoFunctionSelected,
    #[error("Select at least one printer")]
    NoPrinterSelected,
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("user creation failed: {0}")]
    UserCreation(#[source] BackendError),
    #[error("none of the {requested} selected printer(s) are part of the fleet")]
    UnresolvedTargets { requested: usize },
    #[error("provisioning failed: {0}")]
    Provisioning(#[source] BackendError),
}

#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub user: UserRecord,
    pub printer_ids: Vec<PrinterId>,
    /// Summary returned by the service.
    pub message: String,
}

/// Takes the operator's form through validation, user creation and the
/// multi-printer provisioning call, reporting each step to the activity log.
pub struct ProvisioningWorkflow {
    store: Arc<FleetStore>,
    backend: Arc<dyn FleetBackend>,
    initial: ProvisioningForm,
    form: ProvisioningForm,
    smb_fallback_server: String,
    busy: BusyHandle,
}

/// Read-only view of whether a workflow has a submission in flight. Clone it
/// into whatever needs to disable the submit control while the workflow
/// itself is mutably borrowed by `submit`.
#[derive(Debug, Clone, Default)]
pub struct BusyHandle(Arc<AtomicBool>);

impl BusyHandle {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn hold(&self) -> BusyGuard {
        self.0.store(true, Ordering::Release);
        BusyGuard(Arc::clone(&self.0))
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ProvisioningWorkflow {
    /// `initial_form` is what the form resets to after a successful job.
    pub fn new(
        store: Arc<FleetStore>,
        backend: Arc<dyn FleetBackend>,
        initial_form: ProvisioningForm,
    ) -> Self {
        Self {
            store,
            backend,
            form: initial_form.clone(),
            initial: initial_form,
            smb_fallback_server: DEFAULT_SMB_SERVER.to_string(),
            busy: BusyHandle::default(),
        }
    }

    pub fn with_smb_fallback_server(mut self, server: impl Into<String>) -> Self {
        self.smb_fallback_server = server.into();
        self
    }

    pub fn form(&self) -> &ProvisioningForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProvisioningForm {
        &mut self.form
    }

    pub fn set_form(&mut self, form: ProvisioningForm) {
        self.form = form;
    }

    pub fn reset_form(&mut self) {
        self.form = self.initial.clone();
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn busy_handle(&self) -> BusyHandle {
        self.busy.clone()
    }

    /// First failing check wins.
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        let form = &self.form;
        if form.user_name.trim().is_empty() {
            return Err(ValidationFailure::MissingUserName);
        }
        if form.user_pin.trim().is_empty() {
            return Err(ValidationFailure::MissingUserPin);
        }
        if form.network_password.trim().is_empty() {
            return Err(ValidationFailure::MissingFolderPassword);
        }
        if !form.functions.any_enabled() {
            return Err(ValidationFailure::NoFunctionSelected);
        }
        if self.store.selection().is_empty() {
            return Err(ValidationFailure::NoPrinterSelected);
        }
        Ok(())
    }

    pub fn build_request(&self) -> CreateUserRequest {
        let form = &self.form;
        CreateUserRequest {
            name: form.user_name.trim().to_string(),
            pin: form.user_pin.trim().to_string(),
            network_credentials: NetworkCredentials {
                username: form.network_username.clone(),
                password: form.network_password.clone(),
            },
            smb_config: SmbConfig {
                server: extract_smb_server(&form.smb_path, &self.smb_fallback_server),
                port: SMB_PORT,
                path: form.smb_path.clone(),
            },
            available_functions: form.functions,
        }
    }

    /// Runs one provisioning job for the current form against the store's
    /// selection. The form is reset and the selection cleared only when the
    /// whole job succeeds; any failure leaves both for a retry.
    pub async fn submit(&mut self) -> Result<ProvisionOutcome, ProvisioningError> {
        if let Err(failure) = self.validate() {
            self.store.append_log(failure.to_string(), LogLevel::Error);
            return Err(failure.into());
        }

        let outcome = {
            let _busy = self.busy.hold();
            self.execute().await?
        };

        self.reset_form();
        self.store.clear_selection();
        Ok(outcome)
    }

    async fn execute(&self) -> Result<ProvisionOutcome, ProvisioningError> {
        let request = self.build_request();
        self.store
            .info(format!("Creating user: {}...", request.name));

        let user = match self.backend.create_user(&request).await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "provisioning: user creation failed");
                self.store.append_log(
                    format!("Failed to provision user: {}", failure_reason(&err)),
                    LogLevel::Error,
                );
                return Err(ProvisioningError::UserCreation(err));
            }
        };
        self.store.append_log(
            format!("User created: {} (ID: {})", user.name, user.id),
            LogLevel::Success,
        );

        let (requested, printer_ids) = self.store.resolve_selected_targets();
        if printer_ids.is_empty() {
            self.store.append_log(
                "None of the selected printers could be matched to the fleet; reload and select again",
                LogLevel::Error,
            );
            return Err(ProvisioningError::UnresolvedTargets { requested });
        }
        if printer_ids.len() < requested {
            warn!(
                requested,
                resolved = printer_ids.len(),
                "provisioning: stale selection entries skipped"
            );
        }

        self.store.info(format!(
            "Sending configuration to {} printer(s)...",
            printer_ids.len()
        ));
        let response = match self.backend.provision_user(user.id, &printer_ids).await {
            Ok(response) => response,
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "provisioning: job failed");
                self.store.append_log(
                    format!("Failed to provision user: {}", failure_reason(&err)),
                    LogLevel::Error,
                );
                return Err(ProvisioningError::Provisioning(err));
            }
        };

        self.store
            .append_log(response.message.clone(), LogLevel::Success);
        self.store
            .append_log("Configuration sent successfully", LogLevel::Success);
        info!(user_id = %user.id, printers = printer_ids.len(), "provisioning: job complete");

        Ok(ProvisionOutcome {
            user,
            printer_ids,
            message: response.message,
        })
    }
}

fn failure_reason(err: &BackendError) -> String {
    let reason = err.reason();
    if reason.trim().is_empty() {
        "unknown error".to_string()
    } else {
        reason
    }
}

/// Host of a `\\server\share\...` path, or `fallback` for anything else.
pub fn extract_smb_server(path: &str, fallback: &str) -> String {
    path.trim()
        .strip_prefix("\\\\")
        .and_then(|rest| rest.split('\\').next())
        .filter(|server| !server.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
#[path = "tests/provisioning_tests.rs"]
mod tests;
