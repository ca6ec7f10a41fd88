use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;

use crate::error::{AppError, Result};
use crate::feed::DEFAULT_NITTER_INSTANCE;
use crate::models::SourceKind;
use crate::sync::SchedulerSettings;

const APP_DIR: &str = "feed-mosaic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u32,

    /// Days of content kept; older items are neither ingested nor retained.
    #[serde(default = "default_retention_cutoff")]
    pub retention_cutoff_days: u32,

    /// Offset from UTC that item timestamps are normalized to.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourceKind>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_nitter_instance")]
    pub nitter_instance: String,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_idle_poll")]
    pub idle_poll_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_storage_backoff")]
    pub storage_backoff_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("feeds.db").to_string_lossy().to_string()
}

fn default_refresh_interval() -> u32 {
    60
}

fn default_retention_cutoff() -> u32 {
    7
}

fn default_sources() -> Vec<SourceKind> {
    // Instagram stopped serving the public graph endpoint; opt in explicitly
    vec![SourceKind::Youtube, SourceKind::Reddit, SourceKind::Twitter]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_timeout() -> u64 {
    60
}

fn default_nitter_instance() -> String {
    DEFAULT_NITTER_INSTANCE.to_string()
}

fn default_idle_poll() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_storage_backoff() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_poll_secs: default_idle_poll(),
            probe_timeout_secs: default_probe_timeout(),
            storage_backoff_secs: default_storage_backoff(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            refresh_interval_minutes: default_refresh_interval(),
            retention_cutoff_days: default_retention_cutoff(),
            utc_offset_minutes: 0,
            sources: default_sources(),
            log_level: default_log_level(),
            http_timeout_secs: default_http_timeout(),
            nitter_instance: default_nitter_instance(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    /// Loads the default config file, writing one with defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Applies `REFRESH_RATE_MINUTES`, `CUTOFF_DAYS` and `LOG_LEVEL` from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Values that do not parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(minutes) = parse_override(&lookup, "REFRESH_RATE_MINUTES") {
            self.refresh_interval_minutes = minutes;
        }
        if let Some(days) = parse_override(&lookup, "CUTOFF_DAYS") {
            self.retention_cutoff_days = days;
        }
        if let Some(level) = lookup("LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            refresh_interval: Duration::from_secs(u64::from(self.refresh_interval_minutes) * 60),
            retention_days: i64::from(self.retention_cutoff_days),
            idle_poll: Duration::from_secs(self.scheduler.idle_poll_secs),
            probe_timeout: Duration::from_secs(self.scheduler.probe_timeout_secs),
            storage_backoff: Duration::from_secs(self.scheduler.storage_backoff_secs),
        }
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a whole number", key, raw);
            None
        }
    }
}
