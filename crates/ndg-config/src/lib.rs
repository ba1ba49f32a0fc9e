#![deny(unsafe_code)]

//! Configuration loading and validation for ndg.
//!
//! Both binaries (`nd` and `ngui`) read the same TOML file. Every section is
//! optional; missing keys fall back to the defaults documented on each field.
//! [`AppConfig`] is the central configuration structure.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon process supervision.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// UI runtime timing.
    #[serde(default)]
    pub ui: UiConfig,

    /// Status report polling.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Power-off service stop plan.
    #[serde(default)]
    pub poweroff: PowerOffConfig,

    /// Host system commands.
    #[serde(default)]
    pub system: SystemConfig,

    /// Node settings served to the UI.
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the daemon's supervision of the UI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the UI binary spawned with piped stdio.
    #[serde(default = "default_ui_path")]
    pub ui_path: String,

    /// Extra arguments passed to the UI binary.
    #[serde(default)]
    pub ui_args: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            ui_path: default_ui_path(),
            ui_args: Vec::new(),
        }
    }
}

fn default_ui_path() -> String {
    "ngui".to_string()
}

/// UI runtime timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Seconds without user input before the screen goes to standby.
    #[serde(default = "default_standby_idle_secs")]
    pub standby_idle_secs: u64,

    /// How often a sleeping screen is polled for wake-up input, in milliseconds.
    #[serde(default = "default_standby_poll_ms")]
    pub standby_poll_ms: u64,

    /// Upper bound on the render worker's sleep between ticks, in milliseconds.
    #[serde(default = "default_max_tick_ms")]
    pub max_tick_ms: u64,
}

impl UiConfig {
    pub fn standby_idle(&self) -> Duration {
        Duration::from_secs(self.standby_idle_secs)
    }

    pub fn standby_poll(&self) -> Duration {
        Duration::from_millis(self.standby_poll_ms)
    }

    pub fn max_tick(&self) -> Duration {
        Duration::from_millis(self.max_tick_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            standby_idle_secs: default_standby_idle_secs(),
            standby_poll_ms: default_standby_poll_ms(),
            max_tick_ms: default_max_tick_ms(),
        }
    }
}

fn default_standby_idle_secs() -> u64 {
    60
}

fn default_standby_poll_ms() -> u64 {
    100
}

fn default_max_tick_ms() -> u64 {
    100
}

/// Status report polling performed by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Seconds between chain and lightning report polls while the UI is awake.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl ReportsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
        }
    }
}

fn default_poll_secs() -> u64 {
    10
}

/// Services stopped before the host powers off.
///
/// ## TOML Example
///
/// ```toml
/// [poweroff]
/// stop_command = ["sv", "-w", "{timeout}", "stop", "{name}"]
/// poweroff_command = ["poweroff"]
///
/// [[poweroff.services]]
/// name = "lnd"
/// timeout_secs = 600
///
/// [[poweroff.services]]
/// name = "bitcoind"
/// timeout_secs = 600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerOffConfig {
    /// Services to stop, in report order.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceStopConfig>,

    /// Stop command template; `{name}` and `{timeout}` (seconds) are substituted.
    #[serde(default = "default_stop_command")]
    pub stop_command: Vec<String>,

    /// Command that powers the host off.
    #[serde(default = "default_poweroff_command")]
    pub poweroff_command: Vec<String>,
}

impl Default for PowerOffConfig {
    fn default() -> Self {
        Self {
            services: default_services(),
            stop_command: default_stop_command(),
            poweroff_command: default_poweroff_command(),
        }
    }
}

/// A single managed service in the power-off plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStopConfig {
    /// Service name as known to the service supervisor.
    pub name: String,

    /// How long the service may take to stop.
    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

impl ServiceStopConfig {
    pub fn new(name: &str, timeout_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_services() -> Vec<ServiceStopConfig> {
    // lnd first: it must flush its channel state while bitcoind is still up
    vec![
        ServiceStopConfig::new("lnd", default_service_timeout_secs()),
        ServiceStopConfig::new("bitcoind", default_service_timeout_secs()),
    ]
}

fn default_service_timeout_secs() -> u64 {
    600
}

fn default_stop_command() -> Vec<String> {
    ["sv", "-w", "{timeout}", "stop", "{name}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_poweroff_command() -> Vec<String> {
    vec!["poweroff".to_string()]
}

/// Host system commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Hostname command template; `{name}` is substituted.
    #[serde(default = "default_hostname_command")]
    pub hostname_command: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            hostname_command: default_hostname_command(),
        }
    }
}

fn default_hostname_command() -> Vec<String> {
    vec!["hostname".to_string(), "{name}".to_string()]
}

/// Node settings reported to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Node name shown on screen and set as the host name.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// System updates channel: "master" or "dev".
    #[serde(default = "default_sysupdates")]
    pub sysupdates: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            sysupdates: default_sysupdates(),
        }
    }
}

fn default_hostname() -> String {
    "nakamochi".to_string()
}

fn default_sysupdates() -> String {
    "master".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_SYSUPDATES: [&str; 2] = ["master", "dev"];

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.ui_path.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.ui_path must not be empty".to_string(),
            ));
        }

        if self.ui.standby_idle_secs == 0 {
            return Err(ConfigError::Validation(
                "ui.standby_idle_secs must be non-zero".to_string(),
            ));
        }
        if self.ui.standby_poll_ms == 0 {
            return Err(ConfigError::Validation(
                "ui.standby_poll_ms must be non-zero".to_string(),
            ));
        }
        if self.ui.max_tick_ms == 0 {
            return Err(ConfigError::Validation(
                "ui.max_tick_ms must be non-zero".to_string(),
            ));
        }

        if self.reports.poll_secs == 0 {
            return Err(ConfigError::Validation(
                "reports.poll_secs must be non-zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, service) in self.poweroff.services.iter().enumerate() {
            if service.name.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "poweroff.services[{i}].name must not be empty"
                )));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "poweroff.services[{i}].name {:?} is listed twice",
                    service.name
                )));
            }
            if service.timeout_secs == 0 {
                return Err(ConfigError::Validation(format!(
                    "poweroff.services[{i}].timeout_secs must be non-zero"
                )));
            }
        }
        if self.poweroff.stop_command.is_empty() {
            return Err(ConfigError::Validation(
                "poweroff.stop_command must not be empty".to_string(),
            ));
        }
        if self.poweroff.poweroff_command.is_empty() {
            return Err(ConfigError::Validation(
                "poweroff.poweroff_command must not be empty".to_string(),
            ));
        }

        if self.system.hostname_command.is_empty() {
            return Err(ConfigError::Validation(
                "system.hostname_command must not be empty".to_string(),
            ));
        }

        if self.settings.hostname.is_empty() {
            return Err(ConfigError::Validation(
                "settings.hostname must not be empty".to_string(),
            ));
        }
        if !VALID_SYSUPDATES.contains(&self.settings.sysupdates.as_str()) {
            return Err(ConfigError::Validation(format!(
                "settings.sysupdates must be one of {:?}, got {:?}",
                VALID_SYSUPDATES, self.settings.sysupdates
            )));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                VALID_LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.daemon.ui_path, "ngui");
        assert_eq!(config.ui.standby_idle(), Duration::from_secs(60));
        assert_eq!(config.reports.poll_secs, 10);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_poweroff_plan() {
        let config = AppConfig::default();
        let names: Vec<&str> = config
            .poweroff
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["lnd", "bitcoind"]);
        assert_eq!(config.poweroff.services[0].timeout(), Duration::from_secs(600));
        assert_eq!(config.poweroff.stop_command[0], "sv");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.ui.standby_idle_secs, 60);
        assert_eq!(config.settings.hostname, "nakamochi");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [daemon]
            ui_path = "/home/uiuser/ngui"
            ui_args = ["--config", "/etc/ndg.toml"]

            [ui]
            standby_idle_secs = 120
            standby_poll_ms = 50

            [reports]
            poll_secs = 30

            [poweroff]
            stop_command = ["systemctl", "stop", "{name}"]
            poweroff_command = ["systemctl", "poweroff"]

            [[poweroff.services]]
            name = "lnd"
            timeout_secs = 300

            [settings]
            hostname = "satoshi"
            sysupdates = "dev"

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.daemon.ui_path, "/home/uiuser/ngui");
        assert_eq!(config.daemon.ui_args.len(), 2);
        assert_eq!(config.ui.standby_idle(), Duration::from_secs(120));
        assert_eq!(config.ui.standby_poll(), Duration::from_millis(50));
        assert_eq!(config.reports.poll_interval(), Duration::from_secs(30));
        assert_eq!(
            config.poweroff.services,
            vec![ServiceStopConfig::new("lnd", 300)]
        );
        assert_eq!(config.poweroff.poweroff_command, vec!["systemctl", "poweroff"]);
        assert_eq!(config.settings.hostname, "satoshi");
        assert_eq!(config.settings.sysupdates, "dev");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_service_timeout_defaults() {
        let toml = r#"
            [[poweroff.services]]
            name = "electrs"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.poweroff.services[0].timeout_secs, 600);
    }

    #[test]
    fn test_validation_rejects_empty_ui_path() {
        let toml = r#"
            [daemon]
            ui_path = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_idle() {
        let toml = r#"
            [ui]
            standby_idle_secs = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_poll() {
        let toml = r#"
            [reports]
            poll_secs = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_service() {
        let toml = r#"
            [[poweroff.services]]
            name = "lnd"

            [[poweroff.services]]
            name = "lnd"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_validation_rejects_zero_service_timeout() {
        let toml = r#"
            [[poweroff.services]]
            name = "lnd"
            timeout_secs = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_stop_command() {
        let toml = r#"
            [poweroff]
            stop_command = []
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_sysupdates() {
        let toml = r#"
            [settings]
            sysupdates = "nightly"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ndg.toml");
        tokio::fs::write(&path, b"[ui]\nstandby_idle_secs = 5\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.ui.standby_idle_secs, 5);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/ndg.toml")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_or_default_missing_file() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&tmp.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config.daemon.ui_path, "ngui");
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
