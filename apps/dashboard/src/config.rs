use std::{fs, path::Path, str::FromStr, time::Duration};

use clap::ValueEnum;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    Timetable,
    FacilityLocation,
}

impl FromStr for Demo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timetable" | "school-timetabling" => Ok(Demo::Timetable),
            "facility-location" | "facility_location" | "flp" => Ok(Demo::FacilityLocation),
            other => Err(format!("unknown demo '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub demo: Demo,
    pub request_timeout: Duration,
    pub notification_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            demo: Demo::Timetable,
            request_timeout: client_core::transport::DEFAULT_REQUEST_TIMEOUT,
            notification_ttl: client_core::notify::DEFAULT_NOTIFICATION_TTL,
        }
    }
}

pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    load_settings_from(path, |key| std::env::var(key).ok())
}

/// Defaults, then the toml file at `path` when it exists, then environment
/// variables looked up through `env`.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match raw.parse::<toml::Table>() {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("server_url").and_then(scalar) {
                    settings.server_url = v;
                }
                if let Some(v) = file_cfg.get("demo").and_then(scalar) {
                    apply_demo(&mut settings, &v);
                }
                if let Some(v) = file_cfg.get("request_timeout_ms").and_then(scalar) {
                    apply_millis(&mut settings.request_timeout, &v);
                }
                if let Some(v) = file_cfg.get("notification_ttl_secs").and_then(scalar) {
                    apply_secs(&mut settings.notification_ttl, &v);
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable config file"),
        }
    }

    if let Some(v) = env("DASHBOARD_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__DEMO") {
        apply_demo(&mut settings, &v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_MS") {
        apply_millis(&mut settings.request_timeout, &v);
    }

    if let Some(v) = env("APP__NOTIFICATION_TTL_SECS") {
        apply_secs(&mut settings.notification_ttl, &v);
    }

    settings
}

fn scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn apply_demo(settings: &mut Settings, raw: &str) {
    match raw.parse() {
        Ok(demo) => settings.demo = demo,
        Err(err) => warn!(%err, "keeping configured demo"),
    }
}

fn apply_millis(target: &mut Duration, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<u64>() {
        *target = Duration::from_millis(parsed);
    }
}

fn apply_secs(target: &mut Duration, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<u64>() {
        *target = Duration::from_secs(parsed);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
