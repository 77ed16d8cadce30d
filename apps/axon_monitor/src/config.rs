use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use client_core::{
    debounce::DEFAULT_DEBOUNCE,
    poller::{DEFAULT_EXECUTING_POLL_DELAY, DEFAULT_POLL_INTERVAL},
    PollerConfig,
};
use serde::Deserialize;

/// Shortest accepted delay between refetches while an action is executing.
const MIN_EXECUTING_POLL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub axon_id: Option<u64>,
    pub poll_interval_secs: u64,
    pub executing_poll_ms: u64,
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080".into(),
            axon_id: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            executing_poll_ms: DEFAULT_EXECUTING_POLL_DELAY.as_millis() as u64,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            executing_poll_delay: Duration::from_millis(
                self.executing_poll_ms.max(MIN_EXECUTING_POLL_MS),
            ),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Keys accepted in `axon.toml`; anything missing keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    backend_url: Option<String>,
    axon_id: Option<u64>,
    poll_interval_secs: Option<u64>,
    executing_poll_ms: Option<u64>,
    debounce_ms: Option<u64>,
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.backend_url {
        settings.backend_url = v;
    }
    if file.axon_id.is_some() {
        settings.axon_id = file.axon_id;
    }
    if let Some(v) = file.poll_interval_secs {
        settings.poll_interval_secs = v;
    }
    if let Some(v) = file.executing_poll_ms {
        settings.executing_poll_ms = v;
    }
    if let Some(v) = file.debounce_ms {
        settings.debounce_ms = v;
    }
    Ok(())
}

/// `APP__*` names win over the short `AXON_*` ones.
fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("AXON_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = lookup("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    for key in ["AXON_ID", "APP__AXON_ID"] {
        if let Some(v) = lookup(key) {
            settings.axon_id = Some(parse_number(key, &v)?);
        }
    }

    if let Some(v) = lookup("APP__POLL_INTERVAL_SECS") {
        settings.poll_interval_secs = parse_number("APP__POLL_INTERVAL_SECS", &v)?;
    }
    if let Some(v) = lookup("APP__EXECUTING_POLL_MS") {
        settings.executing_poll_ms = parse_number("APP__EXECUTING_POLL_MS", &v)?;
    }
    if let Some(v) = lookup("APP__DEBOUNCE_MS") {
        settings.debounce_ms = parse_number("APP__DEBOUNCE_MS", &v)?;
    }

    Ok(())
}

fn parse_number(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number, got '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
