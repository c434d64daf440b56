// Configuration Module

use anyhow::{bail, Context, Result};
use chrono::Duration as WindowDuration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Settings for one refresh plugin instance, stored as TOML.
///
/// A run only ever reads this; the daemon is the single place that writes
/// it back (to clear `run_once`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    pub enabled: bool,
    /// Run one refresh as soon as the daemon starts, then clear the flag.
    pub run_once: bool,
    /// Five-field crontab expression (a six-field one with seconds is also accepted).
    pub cron: Option<String>,
    /// Size of the lookback window, in `unit`s.
    pub window: u32,
    /// One of `day`, `hour`, `minute`. Validated when a run starts.
    pub unit: String,
    pub poll_interval_secs: u64,
    /// Raw `k=v; k2=v2` credential blob copied from a logged-in browser session.
    pub cookie: Option<String>,
    pub host: Option<String>,
    /// Comma separated classification names refreshed when movies land.
    pub movie_categories: String,
    /// Comma separated classification names refreshed when shows land.
    pub show_categories: String,
    pub refresh_all: bool,
    /// Only transfers whose destination starts with this prefix count.
    pub path_prefix: Option<String>,
    pub notify: bool,
    pub notify_aggregate: bool,
    pub history_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub request_timeout_secs: u64,
    pub copilot: CopilotConfig,
}

/// Settings for the container update assistant.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CopilotConfig {
    pub host: Option<String>,
    pub secret_key: Option<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_once: false,
            cron: None,
            window: 1,
            unit: "day".to_string(),
            poll_interval_secs: 60,
            cookie: None,
            host: None,
            movie_categories: String::new(),
            show_categories: String::new(),
            refresh_all: false,
            path_prefix: None,
            notify: false,
            notify_aggregate: false,
            history_path: None,
            webhook_url: None,
            request_timeout_secs: 30,
            copilot: CopilotConfig::default(),
        }
    }
}

/// Unit of the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Day,
    Hour,
    Minute,
}

impl FromStr for WindowUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(WindowUnit::Day),
            "hour" => Ok(WindowUnit::Hour),
            "minute" => Ok(WindowUnit::Minute),
            other => Err(ConfigError::UnknownUnit(other.to_string())),
        }
    }
}

/// Prefix a scheme when missing and strip a trailing slash.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let mut normalized = if host.starts_with("http") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    if normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

impl PluginConfig {
    /// Apply the same clean-up the settings form used to do on save.
    pub fn normalized(mut self) -> Self {
        self.host = self
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .map(normalize_host);
        self.copilot.host = self
            .copilot
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .map(normalize_host);
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = 60;
        }
        self
    }

    pub fn window_unit(&self) -> Result<WindowUnit, ConfigError> {
        self.unit.parse()
    }

    /// Lookback window as a chrono duration.
    pub fn window_duration(&self) -> Result<WindowDuration, ConfigError> {
        let size = i64::from(self.window);
        Ok(match self.window_unit()? {
            WindowUnit::Day => WindowDuration::days(size),
            WindowUnit::Hour => WindowDuration::hours(size),
            WindowUnit::Minute => WindowDuration::minutes(size),
        })
    }

    /// The configured path prefix, if it is set to something non-blank.
    pub fn path_prefix(&self) -> Result<&str, ConfigError> {
        self.path_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPathPrefix)
    }

    /// Host and credential blob, both required before talking to the NAS.
    pub fn remote(&self) -> Result<(&str, &str), ConfigError> {
        match (self.host.as_deref(), self.cookie.as_deref()) {
            (Some(host), Some(cookie)) if !host.is_empty() && !cookie.trim().is_empty() => {
                Ok((host, cookie))
            }
            _ => Err(ConfigError::MissingRemote),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Default location of the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "mediafresh", "mediafresh") {
            let config_dir = proj_dirs.config_dir();
            std::fs::create_dir_all(config_dir)?;
            Ok(config_dir.join("mediafresh.toml"))
        } else {
            bail!("Could not determine configuration directory")
        }
    }

    /// Load the configuration, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&s)
            .with_context(|| format!("Failed to parse TOML from config file: {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Persist `run_once = false` so the next start does not fire again.
    /// Does nothing if the flag is already clear.
    pub fn clear_run_once(&mut self, path: &Path) -> Result<()> {
        if !self.run_once {
            return Ok(());
        }
        self.run_once = false;
        self.save(path).context("Failed to clear run_once flag")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, s)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
