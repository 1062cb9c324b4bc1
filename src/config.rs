//! Layered configuration for the monitor.
//!
//! Compiled-in defaults, then an optional TOML file, then environment
//! variables. The result is validated once at startup and handed to each
//! component; nothing reads the environment after that.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::report::{ReportZone, ZoneError};
use crate::scheduler::{ScheduleError, ScheduleSpec};
use crate::targets::{self, Target};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "BOTWATCH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },
    #[error("duplicate target name '{0}'")]
    DuplicateTarget(String),
    #[error("target '{0}' has an empty URL")]
    EmptyUrl(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Zone(#[from] ZoneError),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the monitor process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "targets::defaults")]
    pub targets: Vec<Target>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            telegram: TelegramConfig::default(),
            probe: ProbeConfig::default(),
            schedule: ScheduleConfig::default(),
            targets: targets::defaults(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Build the effective configuration from the process environment.
    ///
    /// `path` (from the CLI) wins over `BOTWATCH_CONFIG`; with neither, the
    /// compiled-in defaults are the base layer.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.is_empty());
        let file = path.map(Path::to_path_buf).or(env_path.map(PathBuf::from));

        let mut config = match file {
            Some(path) => Self::load(&path)?,
            None => {
                debug!("No config file given, using compiled-in defaults");
                Self::default()
            }
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables, read through `lookup`. Empty values are
    /// treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(expr) = get("CHECK_INTERVAL") {
            self.schedule.incident_check = expr;
        }
        if let Some(expr) = get("DAILY_REPORT_CRON") {
            self.schedule.full_report = expr;
        }
        if let Some(offset) = get("REPORT_TZ_OFFSET") {
            self.schedule.utc_offset = offset;
        }
        if let Some(label) = get("REPORT_TZ_LABEL") {
            self.schedule.timezone_label = label;
        }
        if let Some(port) = get("PORT") {
            self.service.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        for target in &mut self.targets {
            if let Some(url) = target.url_env.as_deref().and_then(&get) {
                debug!(target_name = %target.name, "Target URL overridden from environment");
                target.url = url;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
            if target.url.trim().is_empty() {
                return Err(ConfigError::EmptyUrl(target.name.clone()));
            }
        }
        self.schedule_spec()?;
        Ok(())
    }

    pub fn zone(&self) -> Result<ReportZone, ConfigError> {
        Ok(ReportZone::parse(
            &self.schedule.utc_offset,
            &self.schedule.timezone_label,
        )?)
    }

    pub fn schedule_spec(&self) -> Result<ScheduleSpec, ConfigError> {
        Ok(ScheduleSpec::parse(
            &self.schedule.full_report,
            &self.schedule.incident_check,
            self.zone()?,
        )?)
    }

    /// Push notifications need both a bot token and a recipient.
    pub fn notifications_enabled(&self) -> bool {
        self.telegram.bot_token.is_some() && self.telegram.chat_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Identity and listener of the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "botwatch".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServiceConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// The single chat allowed to issue commands and receive pushes.
    pub chat_id: Option<String>,
    pub api_base: String,
    /// Long-poll wait for `getUpdates`, in seconds.
    pub poll_timeout_sec: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: crate::notify::telegram::DEFAULT_API_BASE.to_string(),
            poll_timeout_sec: 30,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("poll_timeout_sec", &self.poll_timeout_sec)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
    /// Pause between two consecutive targets within one cycle.
    pub spacing_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            spacing_ms: 1_000,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_ms)
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Cron cadences, evaluated in the report time zone. `off` disables a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub incident_check: String,
    pub full_report: String,
    pub utc_offset: String,
    pub timezone_label: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            incident_check: "0 * * * *".to_string(),
            full_report: "0 9 * * *".to_string(),
            utc_offset: "+03:00".to_string(),
            timezone_label: "MSK".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.service.port, 3000);
        assert_eq!(cfg.probe.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.probe.spacing(), Duration::from_secs(1));
        assert_eq!(cfg.targets.len(), 3);
        assert!(!cfg.notifications_enabled());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", " 42 "),
            ("CHECK_INTERVAL", "*/5 * * * *"),
            ("DAILY_REPORT_CRON", "off"),
            ("PORT", "8081"),
            ("DREAM_SENSE_BOT_URL", "http://localhost:9000/health"),
        ]))
        .unwrap();

        assert_eq!(cfg.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(cfg.telegram.chat_id.as_deref(), Some("42"));
        assert_eq!(cfg.schedule.incident_check, "*/5 * * * *");
        assert_eq!(cfg.service.port, 8081);
        assert_eq!(cfg.targets[0].url, "http://localhost:9000/health");
        assert_eq!(cfg.targets[1].url, "https://dream-sense-test-bot.railway.app/health");
        assert!(cfg.notifications_enabled());
        assert!(cfg.schedule_spec().unwrap().full_report.is_none());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[("TELEGRAM_BOT_TOKEN", ""), ("CHECK_INTERVAL", "  ")]))
            .unwrap();
        assert!(cfg.telegram.bot_token.is_none());
        assert_eq!(cfg.schedule.incident_check, "0 * * * *");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "PORT"));
    }

    #[test]
    fn test_duplicate_target_names_are_rejected() {
        let mut cfg = Config::default();
        cfg.targets.push(cfg.targets[0].clone());
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateTarget(_))));
    }

    #[test]
    fn test_bad_cron_is_rejected() {
        let mut cfg = Config::default();
        cfg.schedule.incident_check = "sometimes".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Schedule(_))));
    }

    #[test]
    fn test_bad_offset_is_rejected() {
        let mut cfg = Config::default();
        cfg.schedule.utc_offset = "Europe/Moscow".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Zone(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[probe]
timeout_ms = 2500

[[targets]]
name = "api"
url = "https://api.example.com/health"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.probe.timeout_ms, 2500);
        assert_eq!(cfg.probe.spacing_ms, 1000);
        assert_eq!(cfg.targets.len(), 1);
        assert_eq!(cfg.targets[0].name, "api");
        assert!(cfg.targets[0].url_env.is_none());
        assert_eq!(cfg.schedule.full_report, "0 9 * * *");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.targets, targets::defaults());
        assert_eq!(cfg.service.port, 3000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("botwatch.toml");
        std::fs::write(
            &path,
            r#"
[service]
name = "ops-monitor"
port = 9999
"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.service.name, "ops-monitor");
        assert_eq!(cfg.service.bind_address(), "0.0.0.0:9999");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/path/botwatch.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut cfg = Config::default();
        cfg.telegram.bot_token = Some("123:very-secret".to_string());
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
