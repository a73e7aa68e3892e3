use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use console_core::{
    CandidateField, DeviceCard, DiscoverySession, FleetStore, HttpFleetBackend, Inventory,
    LogChannel, LogEntry, ProvisioningForm, ProvisioningWorkflow,
};
use shared::{domain::LogLevel, protocol::PrinterUpdate};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

use cli::{functions_from_flags, Cli, Command, RegistrationEdit};
use config::{load_settings, prepare_api_url, Settings};

struct Console {
    settings: Settings,
    store: Arc<FleetStore>,
    backend: Arc<HttpFleetBackend>,
    inventory: Inventory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let api_url = prepare_api_url(&settings.api_url)?;
    let backend = Arc::new(
        HttpFleetBackend::with_timeout(
            &api_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
        .with_context(|| format!("failed to set up client for {api_url}"))?,
    );
    info!(api_url = backend.api_url(), "fleet console starting");

    let store = Arc::new(FleetStore::new());
    let console = Console {
        inventory: Inventory::new(Arc::clone(&store), backend.clone()),
        settings,
        store,
        backend,
    };

    // watch prints entries as they arrive
    let print_log = !matches!(cli.command, Command::Watch);
    let outcome = console.run(cli.command).await;
    if print_log {
        for entry in console.store.logs() {
            print_entry(&entry);
        }
    }
    outcome
}

impl Console {
    async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Devices => {
                self.inventory.bootstrap().await?;
                for device in self.store.devices() {
                    print_card(&DeviceCard::from(&device));
                }
            }
            Command::Watch => self.watch().await,
            Command::Scan { range, register } => self.scan(range, register).await?,
            Command::Provision {
                user,
                pin,
                password,
                network_user,
                smb_path,
                functions,
                devices,
            } => {
                self.inventory.reload().await?;
                for device in &devices {
                    if !self.store.is_selected(device) {
                        self.store.toggle_selected(device);
                    }
                }

                let initial = ProvisioningForm::default()
                    .with_network_username(self.settings.network_username.clone());
                let mut workflow = ProvisioningWorkflow::new(
                    Arc::clone(&self.store),
                    self.backend.clone(),
                    initial.clone(),
                )
                .with_smb_fallback_server(self.settings.smb_fallback_server.clone());
                workflow.set_form(ProvisioningForm {
                    user_name: user,
                    user_pin: pin,
                    network_username: network_user.unwrap_or(initial.network_username),
                    network_password: password,
                    smb_path,
                    functions: functions_from_flags(&functions, initial.functions),
                });
                workflow.submit().await?;
            }
            Command::Edit {
                device,
                hostname,
                location,
            } => {
                self.inventory.reload().await?;
                self.inventory
                    .update_device(&device, PrinterUpdate { hostname, location })
                    .await?;
            }
            Command::Refresh { device } => {
                self.inventory.reload().await?;
                self.inventory.refresh_device(&device).await?;
            }
        }
        Ok(())
    }

    async fn scan(
        &self,
        range: Option<String>,
        register: Vec<RegistrationEdit>,
    ) -> anyhow::Result<()> {
        let range = range.unwrap_or_else(|| self.settings.scan_range.clone());
        let mut session = DiscoverySession::new(Arc::clone(&self.store), self.backend.clone());
        session.scan(&range).await?;
        for candidate in session.candidates() {
            let scanned = &candidate.scanned;
            println!(
                "{:<15}  {:<24}  {:<8}  {}",
                scanned.ip_address,
                scanned.hostname,
                scanned.status,
                scanned.detected_model.as_deref().unwrap_or("-"),
            );
        }

        if register.is_empty() {
            session.close();
            return Ok(());
        }
        for edit in register {
            if session.candidate(&edit.ip_address).is_none() {
                self.store.append_log(
                    format!("{} was not found by this scan", edit.ip_address),
                    LogLevel::Warning,
                );
                continue;
            }
            if let Some(hostname) = edit.hostname {
                session.edit_candidate(&edit.ip_address, CandidateField::Hostname, hostname);
            }
            if let Some(location) = edit.location {
                session.edit_candidate(&edit.ip_address, CandidateField::Location, location);
            }
            if !session.is_candidate_selected(&edit.ip_address) {
                session.toggle_candidate(&edit.ip_address);
            }
        }
        let registered = session.register().await;
        session.close();
        registered?;
        self.inventory.reload().await?;
        Ok(())
    }

    async fn watch(&self) {
        let mut entries = self.store.subscribe_logs();
        let socket_url = self.backend.log_socket_url();
        let channel = LogChannel::open(socket_url.clone(), Arc::clone(&self.store));
        println!("Following {socket_url} (Ctrl+C to stop)");

        let mut liveness = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = liveness.tick() => {}
                received = entries.recv() => match received {
                    Ok(entry) => print_entry(&entry),
                    Err(RecvError::Lagged(skipped)) => {
                        eprintln!("... {skipped} log entries skipped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
            if !channel.is_running() {
                eprintln!("log socket closed by the service");
                break;
            }
        }

        channel.close().await;
    }
}

fn print_entry(entry: &LogEntry) {
    println!(
        "[{}] {:<7} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.level.as_str(),
        entry.message
    );
}

fn print_card(card: &DeviceCard) {
    let [cyan, magenta, yellow, black] = card.toner;
    println!(
        "{:>4}  {:<24}  {:<15}  {:<7}  {:<20}  C{cyan:>3} M{magenta:>3} Y{yellow:>3} K{black:>3}",
        card.id,
        card.name,
        card.ip,
        card.status.as_str(),
        card.location.as_deref().unwrap_or("-"),
    );
}
