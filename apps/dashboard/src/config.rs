use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::pinning::DEFAULT_PINNING_ENDPOINT;
use loader::{LoaderConfigError, LoaderTimings};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
    pub pinning_endpoint: String,
    pub pinning_jwt: Option<String>,
    pub loader: LoaderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/api".into(),
            request_timeout_secs: 30,
            log_filter: "info".into(),
            pinning_endpoint: DEFAULT_PINNING_ENDPOINT.into(),
            pinning_jwt: None,
            loader: LoaderSettings::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Loader timings as written in the config file, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub ramp_tick_ms: u64,
    pub ramp_step: f64,
    pub ramp_ceiling: f64,
    pub catch_up_tick_ms: u64,
    pub catch_up_step: f64,
    pub catch_up_deadline_ms: u64,
    pub complete_hold_ms: u64,
    pub settle_delay_ms: u64,
    pub reset_delay_ms: u64,
    pub request_timeout_ms: Option<u64>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        let timings = LoaderTimings::default();
        Self {
            ramp_tick_ms: millis(timings.ramp_tick),
            ramp_step: timings.ramp_step,
            ramp_ceiling: timings.ramp_ceiling,
            catch_up_tick_ms: millis(timings.catch_up_tick),
            catch_up_step: timings.catch_up_step,
            catch_up_deadline_ms: millis(timings.catch_up_deadline),
            complete_hold_ms: millis(timings.complete_hold),
            settle_delay_ms: millis(timings.settle_delay),
            reset_delay_ms: millis(timings.reset_delay),
            request_timeout_ms: timings.request_timeout.map(millis),
        }
    }
}

impl LoaderSettings {
    pub fn to_timings(&self) -> Result<LoaderTimings, LoaderConfigError> {
        let timings = LoaderTimings {
            ramp_tick: Duration::from_millis(self.ramp_tick_ms),
            ramp_step: self.ramp_step,
            ramp_ceiling: self.ramp_ceiling,
            catch_up_tick: Duration::from_millis(self.catch_up_tick_ms),
            catch_up_step: self.catch_up_step,
            catch_up_deadline: Duration::from_millis(self.catch_up_deadline_ms),
            complete_hold: Duration::from_millis(self.complete_hold_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            reset_delay: Duration::from_millis(self.reset_delay_ms),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        };
        timings.validate()?;
        Ok(timings)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Defaults, then the config file, then environment overrides.
///
/// An explicitly named file must exist; the default `dashboard.toml` is
/// optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let mut settings = if path.exists() {
        parse_settings_file(&path)?
    } else if required {
        anyhow::bail!("config file '{}' does not exist", path.display());
    } else {
        Settings::default()
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn parse_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DASHBOARD_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = lookup("APP__PINNING_ENDPOINT") {
        settings.pinning_endpoint = v;
    }
    if let Some(v) = lookup("DASHBOARD_PINNING_JWT") {
        settings.pinning_jwt = Some(v);
    }
    if let Some(v) = lookup("APP__PINNING_JWT") {
        settings.pinning_jwt = Some(v);
    }

    if let Some(v) = lookup("APP__RAMP_TICK_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.loader.ramp_tick_ms = parsed;
        }
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
        settings.loader.request_timeout_ms = v.parse::<u64>().ok().filter(|ms| *ms > 0);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
