//! Configuration management for the visitor export server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::{models::visitor_record::WindowKind, services::generator::VisitorDataGenerator};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

/// Raw FTP settings as found in the environment.
///
/// Everything is kept as an optional string so the server can start without
/// FTP configured; values are validated into
/// [`FtpCredentials`](crate::services::ftp::FtpCredentials) on each delivery.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FtpSettings {
    pub hostname: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub remote_dir: Option<String>,
    pub use_tls: Option<String>,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    /// IANA zone used to resolve "now" into a local reference time
    pub timezone: String,
    /// Window used when a trigger does not ask for one
    pub default_window: WindowKind,
    pub hours_back: i64,
    pub max_hours_back: i64,
    pub interval_minutes: u32,
    /// Relative spread of the random perturbation, in `[0, 1)`
    pub variation: f64,
    pub overwrite_existing: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ftp: FtpSettings,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // VISITOR_EXPORT_EXPORT__TIMEZONE=Asia/Tokyo and friends
            .add_source(
                Environment::with_prefix("VISITOR_EXPORT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // The FTP endpoint is configured through the plain FTP_* variables
            .set_override_option("ftp.hostname", env::var("FTP_HOSTNAME").ok())?
            .set_override_option("ftp.port", env::var("FTP_PORT").ok())?
            .set_override_option("ftp.username", env::var("FTP_USERNAME").ok())?
            .set_override_option("ftp.password", env::var("FTP_PASSWORD").ok())?
            .set_override_option("ftp.remote_dir", env::var("FTP_REMOTE_DIR").ok())?
            .set_override_option("ftp.use_tls", env::var("FTP_USE_TLS").ok())?
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.export.validate()?;
        Ok(config)
    }
}

impl ExportConfig {
    /// Reject settings no export could run with, so they fail at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        VisitorDataGenerator::from_config(self)
            .map_err(|e| ConfigError::Message(format!("Invalid export configuration: {}", e)))?;
        if !(1..=self.max_hours_back).contains(&self.hours_back) {
            return Err(ConfigError::Message(format!(
                "Default hours_back {} outside 1..={}",
                self.hours_back, self.max_hours_back
            )));
        }
        Ok(())
    }

    /// Parse the configured timezone
    pub fn zone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::Message(format!("Unknown timezone: {}", self.timezone)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for FtpSettings {
    fn default() -> Self {
        Self {
            hostname: None,
            port: None,
            username: None,
            password: None,
            remote_dir: None,
            use_tls: None,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            default_window: WindowKind::Current,
            hours_back: 24,
            max_hours_back: 24 * 31,
            interval_minutes: 15,
            variation: 0.3,
            overwrite_existing: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_export_config_is_valid() {
        assert!(ExportConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_export_config_is_rejected() {
        for config in [
            ExportConfig { timezone: "Mars/Olympus".into(), ..Default::default() },
            ExportConfig { interval_minutes: 7, ..Default::default() },
            ExportConfig { variation: -0.5, ..Default::default() },
            ExportConfig { max_hours_back: 0, ..Default::default() },
            ExportConfig { hours_back: 800, ..Default::default() },
        ] {
            assert!(config.validate().is_err(), "{:?} accepted", config);
        }
    }
}
