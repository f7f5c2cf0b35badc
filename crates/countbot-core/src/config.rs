//! CountBot configuration, loaded from `~/.countbot/config.toml`.
//!
//! Every section has defaults, so a missing file or a partial file is
//! fine; only malformed TOML is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CountBotError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountBotConfig {
    /// SQLite database file. `~` is expanded.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Only groups whose name starts with this prefix are tracked
    /// (compared trimmed and case-insensitively).
    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_database_path() -> String { "~/.countbot/countbot.db".into() }
fn default_group_prefix() -> String { "offertando -".into() }

impl Default for CountBotConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            group_prefix: default_group_prefix(),
            schedule: ScheduleConfig::default(),
            retry: RetryConfig::default(),
            sync: SyncConfig::default(),
            commands: CommandsConfig::default(),
            bridge: BridgeConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Cron expressions (5 fields, local time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_report_times")]
    pub report_times: Vec<String>,
    #[serde(default = "default_reset_time")]
    pub reset_time: String,
    /// Snapshot repair pass; disabled when unset.
    #[serde(default)]
    pub repair_time: Option<String>,
}

fn default_report_times() -> Vec<String> {
    vec![
        "59 23 * * *".into(),
        "0 8 * * *".into(),
        "0 13 * * *".into(),
        "0 18 * * *".into(),
    ]
}
fn default_reset_time() -> String { "0 0 * * *".into() }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            report_times: default_report_times(),
            reset_time: default_reset_time(),
            repair_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Fixed wait between attempts.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Extra attempts allowed by the bounded policies.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Bounded delivery retries only throttling errors.
    #[serde(default)]
    pub delivery_rate_limit_only: bool,
    /// Bounded metadata fetch retries only throttling errors.
    #[serde(default = "default_true")]
    pub metadata_rate_limit_only: bool,
    /// Membership events fetch metadata with the unbounded policy.
    #[serde(default)]
    pub event_metadata_unbounded: bool,
}

fn default_interval_secs() -> u64 { 5 }
fn default_max_retries() -> u32 { 3 }
fn default_true() -> bool { true }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_retries: default_max_retries(),
            delivery_rate_limit_only: false,
            metadata_rate_limit_only: true,
            event_metadata_unbounded: false,
        }
    }
}

impl RetryConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: u64,
}

fn default_batch_size() -> usize { 5 }
fn default_batch_delay_secs() -> u64 { 2 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
        }
    }
}

/// Chat commands, matched against the whole trimmed, lower-cased message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_cmd_participants")]
    pub participants: String,
    #[serde(default = "default_cmd_select")]
    pub select: String,
    #[serde(default = "default_cmd_update_groups")]
    pub update_groups: String,
}

fn default_cmd_participants() -> String { "@participantes".into() }
fn default_cmd_select() -> String { "@selecionargrupo".into() }
fn default_cmd_update_groups() -> String { "@atualizargrupos".into() }

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            participants: default_cmd_participants(),
            select: default_cmd_select(),
            update_groups: default_cmd_update_groups(),
        }
    }
}

/// HTTP bridge that owns the chat-network session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
}

fn default_bridge_url() -> String { "http://127.0.0.1:3000".into() }
fn default_bridge_timeout() -> u64 { 30 }

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            token: None,
            timeout_secs: default_bridge_timeout(),
        }
    }
}

/// Inbound webhook server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Shared secret expected in `x-countbot-secret`.
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_gateway_host() -> String { "127.0.0.1".into() }
fn default_gateway_port() -> u16 { 3100 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            secret: None,
        }
    }
}

impl CountBotConfig {
    /// `~/.countbot`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".countbot")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CountBotError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CountBotError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CountBotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database_path).to_string())
    }

    /// Structural checks. Cron expressions are checked by the scheduler
    /// when it builds its job list.
    pub fn validate(&self) -> Result<()> {
        if self.group_prefix.trim().is_empty() {
            return Err(CountBotError::config("group_prefix must not be empty"));
        }
        if self.retry.interval_secs == 0 {
            return Err(CountBotError::config("retry.interval_secs must be at least 1"));
        }
        if self.sync.batch_size == 0 {
            return Err(CountBotError::config("sync.batch_size must be at least 1"));
        }
        if !self.bridge.base_url.starts_with("http://") && !self.bridge.base_url.starts_with("https://") {
            return Err(CountBotError::config(format!(
                "bridge.base_url must be an http(s) URL, got '{}'",
                self.bridge.base_url
            )));
        }
        Ok(())
    }
}
