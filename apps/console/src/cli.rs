use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use shared::protocol::AvailableFunctions;

#[derive(Parser, Debug)]
#[command(name = "fleet-console", about = "Operator console for the printer fleet")]
pub struct Cli {
    /// Inventory service base url; overrides console.toml and the environment.
    #[arg(long, global = true)]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the registered printers.
    Devices,
    /// Follow the service's activity log until interrupted.
    Watch,
    /// Scan a range for printers and optionally register some of them.
    Scan {
        /// CIDR range; defaults to the configured scan range.
        #[arg(long)]
        range: Option<String>,
        /// IP[=HOSTNAME[@LOCATION]] of a found printer to register.
        #[arg(long = "register", value_name = "IP[=HOSTNAME[@LOCATION]]")]
        register: Vec<RegistrationEdit>,
    },
    /// Create a user and push it to the given printers.
    Provision {
        #[arg(long)]
        user: String,
        /// User code entered on the printer panel.
        #[arg(long)]
        pin: String,
        /// Scan folder password.
        #[arg(long)]
        password: String,
        #[arg(long)]
        network_user: Option<String>,
        #[arg(long, default_value = "")]
        smb_path: String,
        /// Enabled functions; scanner only when omitted.
        #[arg(long = "function", value_enum)]
        functions: Vec<FunctionFlag>,
        #[arg(long = "device", required = true)]
        devices: Vec<String>,
    },
    /// Rename or relocate a registered printer.
    Edit {
        #[arg(long)]
        device: String,
        #[arg(long)]
        hostname: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Re-poll a printer's status and toner over SNMP.
    Refresh {
        #[arg(long)]
        device: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FunctionFlag {
    Copier,
    CopierColor,
    Printer,
    PrinterColor,
    DocumentServer,
    Fax,
    Scanner,
    Browser,
}

/// Builds the function set from flags. No flags keeps `fallback`.
pub fn functions_from_flags(
    flags: &[FunctionFlag],
    fallback: AvailableFunctions,
) -> AvailableFunctions {
    if flags.is_empty() {
        return fallback;
    }
    let mut functions = AvailableFunctions::default();
    for flag in flags {
        match flag {
            FunctionFlag::Copier => functions.copier = true,
            FunctionFlag::CopierColor => functions.copier_color = true,
            FunctionFlag::Printer => functions.printer = true,
            FunctionFlag::PrinterColor => functions.printer_color = true,
            FunctionFlag::DocumentServer => functions.document_server = true,
            FunctionFlag::Fax => functions.fax = true,
            FunctionFlag::Scanner => functions.scanner = true,
            FunctionFlag::Browser => functions.browser = true,
        }
    }
    functions
}

/// `IP[=HOSTNAME[@LOCATION]]` from the scan command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEdit {
    pub ip_address: String,
    pub hostname: Option<String>,
    pub location: Option<String>,
}

impl FromStr for RegistrationEdit {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (ip_address, rest) = match raw.split_once('=') {
            Some((ip, rest)) => (ip.trim(), Some(rest)),
            None => (raw.trim(), None),
        };
        if ip_address.is_empty() {
            return Err(format!("missing ip address in '{raw}'"));
        }
        let (hostname, location) = match rest.map(|rest| rest.split_once('@')) {
            Some(Some((hostname, location))) => (Some(hostname), Some(location)),
            Some(None) => (rest, None),
            None => (None, None),
        };
        let non_blank = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            ip_address: ip_address.to_string(),
            hostname: non_blank(hostname),
            location: non_blank(location),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_edit_forms() {
        assert_eq!(
            "10.0.0.7".parse::<RegistrationEdit>(),
            Ok(RegistrationEdit {
                ip_address: "10.0.0.7".into(),
                hostname: None,
                location: None,
            })
        );
        assert_eq!(
            "10.0.0.7=RICOH-HR@Second floor".parse::<RegistrationEdit>(),
            Ok(RegistrationEdit {
                ip_address: "10.0.0.7".into(),
                hostname: Some("RICOH-HR".into()),
                location: Some("Second floor".into()),
            })
        );
        let location_only: RegistrationEdit = "10.0.0.7=@Lobby".parse().expect("parse");
        assert_eq!(location_only.hostname, None);
        assert_eq!(location_only.location.as_deref(), Some("Lobby"));
        assert!("=RICOH".parse::<RegistrationEdit>().is_err());
    }

    #[test]
    fn explicit_flags_replace_the_default_scanner() {
        let fallback = AvailableFunctions {
            scanner: true,
            ..AvailableFunctions::default()
        };
        assert_eq!(functions_from_flags(&[], fallback), fallback);

        let functions =
            functions_from_flags(&[FunctionFlag::Copier, FunctionFlag::CopierColor], fallback);
        assert!(functions.copier && functions.copier_color);
        assert!(!functions.scanner);
    }

    #[test]
    fn provision_requires_a_device() {
        let parsed = Cli::try_parse_from([
            "fleet-console",
            "provision",
            "--user",
            "Ana",
            "--pin",
            "1",
            "--password",
            "pw",
        ]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from([
            "fleet-console",
            "--api-url",
            "http://inv:8000",
            "provision",
            "--user",
            "Ana",
            "--pin",
            "1",
            "--password",
            "pw",
            "--function",
            "document-server",
            "--device",
            "4",
            "--device",
            "9",
        ])
        .expect("parse");
        assert_eq!(cli.api_url.as_deref(), Some("http://inv:8000"));
        let Command::Provision {
            functions, devices, ..
        } = cli.command
        else {
            panic!("expected provision");
        };
        assert_eq!(functions, vec![FunctionFlag::DocumentServer]);
        assert_eq!(devices, vec!["4", "9"]);
    }
}
