use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub smb_fallback_server: String,
    pub network_username: String,
    pub scan_range: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            smb_fallback_server: console_core::DEFAULT_SMB_SERVER.into(),
            network_username: String::new(),
            scan_range: "192.168.1.0/24".into(),
            request_timeout_secs: 120,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new("console.toml"));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) else {
        tracing::warn!(path = %path.display(), "ignoring unreadable console config");
        return;
    };
    let text = |key: &str| file_cfg.get(key).and_then(toml::Value::as_str).map(str::to_string);

    if let Some(v) = text("api_url") {
        settings.api_url = v;
    }
    if let Some(v) = text("smb_fallback_server") {
        settings.smb_fallback_server = v;
    }
    if let Some(v) = text("network_username") {
        settings.network_username = v;
    }
    if let Some(v) = text("scan_range") {
        settings.scan_range = v;
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
        .and_then(|secs| u64::try_from(secs).ok())
    {
        settings.request_timeout_secs = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("FLEET_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__SMB_FALLBACK_SERVER") {
        settings.smb_fallback_server = v;
    }
    if let Some(v) = var("APP__NETWORK_USERNAME") {
        settings.network_username = v;
    }
    if let Some(v) = var("APP__SCAN_RANGE") {
        settings.scan_range = v;
    }
    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

/// Accepts a bare `host:port` as shorthand for `http://host:port`.
pub fn prepare_api_url(raw_api_url: &str) -> anyhow::Result<String> {
    let raw_api_url = raw_api_url.trim();
    if raw_api_url.is_empty() {
        return Ok(Settings::default().api_url);
    }

    let candidate = if raw_api_url.contains("://") {
        raw_api_url.to_string()
    } else {
        format!("http://{raw_api_url}")
    };
    let parsed = Url::parse(&candidate)
        .with_context(|| format!("invalid inventory service url '{raw_api_url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("inventory service url must use http or https, got '{raw_api_url}'");
    }
    Ok(candidate.trim_end_matches('/').to_string())
}
