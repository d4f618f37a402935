//! Validated FTP endpoint credentials

use std::fmt;

use crate::{config::FtpSettings, error::ExportError};

const DEFAULT_PORT: u16 = 21;
const DEFAULT_REMOTE_DIR: &str = "/";

#[derive(Clone, PartialEq, Eq)]
pub struct FtpCredentials {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub remote_dir: String,
    pub use_tls: bool,
}

// Keep the password out of logs
impl fmt::Debug for FtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpCredentials")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("remote_dir", &self.remote_dir)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl FtpCredentials {
    /// Remote path a file named `filename` is stored under
    pub fn remote_path(&self, filename: &str) -> String {
        if self.remote_dir.ends_with('/') {
            format!("{}{}", self.remote_dir, filename)
        } else {
            format!("{}/{}", self.remote_dir, filename)
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl FtpSettings {
    /// Whether an FTP host is configured at all, with the same blank check
    /// credential validation applies
    pub fn has_hostname(&self) -> bool {
        is_set(&self.hostname)
    }
}

impl TryFrom<&FtpSettings> for FtpCredentials {
    type Error = ExportError;

    fn try_from(settings: &FtpSettings) -> Result<Self, Self::Error> {
        let hostname = required(&settings.hostname, "FTP_HOSTNAME")?.trim().to_string();
        let username = required(&settings.username, "FTP_USERNAME")?;
        let password = required(&settings.password, "FTP_PASSWORD")?;

        let port = match non_empty(&settings.port) {
            Some(raw) => raw.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                ExportError::Configuration(format!("FTP_PORT is not a valid port: {}", raw))
            })?,
            None => DEFAULT_PORT,
        };

        let use_tls = match non_empty(&settings.use_tls) {
            Some(raw) => parse_flag(raw).ok_or_else(|| {
                ExportError::Configuration(format!("FTP_USE_TLS is not a boolean: {}", raw))
            })?,
            None => false,
        };

        let remote_dir = non_empty(&settings.remote_dir)
            .unwrap_or(DEFAULT_REMOTE_DIR)
            .to_string();

        Ok(Self {
            hostname,
            port,
            username,
            password,
            remote_dir,
            use_tls,
        })
    }
}

fn is_set(value: &Option<String>) -> bool {
    non_empty(value).is_some()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// Blank values count as missing, but credentials are passed on untrimmed
fn required(value: &Option<String>, name: &str) -> Result<String, ExportError> {
    value
        .as_deref()
        .filter(|_| is_set(value))
        .map(str::to_string)
        .ok_or_else(|| ExportError::Configuration(format!("{} is not set", name)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
