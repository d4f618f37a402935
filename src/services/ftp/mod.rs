//! FTP delivery client
//!
//! Every attempt runs `Connecting -> Authenticating -> Uploading` on a fresh
//! session and ends closed. The session is wrapped in [`ScopedSession`],
//! which sends QUIT when dropped, so the connection is released on every
//! exit path including a panic mid-upload.

mod credentials;
pub mod transport;

use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

pub use credentials::FtpCredentials;
pub use transport::{FtpConnector, FtpSession, SuppaFtpConnector, TransportError};

use crate::{
    config::FtpSettings,
    error::ExportError,
    models::{DeliveryReport, ProbeReport},
};

const PROBE_SAMPLE_FILES: usize = 5;

/// Stage of a delivery attempt, used to classify failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connecting,
    Authenticating,
    Uploading,
}

impl Stage {
    fn fail(self, err: TransportError) -> ExportError {
        match self {
            Stage::Connecting => ExportError::Connection(err.0),
            Stage::Authenticating => ExportError::Authentication(err.0),
            Stage::Uploading => ExportError::Transfer(err.0),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connecting => "connecting",
            Stage::Authenticating => "authenticating",
            Stage::Uploading => "uploading",
        };
        f.write_str(name)
    }
}

/// Authenticated session that is closed when dropped
struct ScopedSession {
    session: Box<dyn FtpSession>,
    host: String,
}

impl ScopedSession {
    fn open(connector: &dyn FtpConnector, credentials: &FtpCredentials) -> Result<Self, ExportError> {
        tracing::info!(stage = %Stage::Connecting, "Connecting to {}", credentials.address());
        let session = connector
            .connect(credentials)
            .map_err(|e| Stage::Connecting.fail(e))?;

        let mut scoped = Self {
            session,
            host: credentials.hostname.clone(),
        };

        tracing::info!(stage = %Stage::Authenticating, "Logging in as {}", credentials.username);
        scoped
            .login(&credentials.username, &credentials.password)
            .map_err(|e| Stage::Authenticating.fail(e))?;

        Ok(scoped)
    }
}

impl Deref for ScopedSession {
    type Target = dyn FtpSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for ScopedSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        match self.session.quit() {
            Ok(()) => tracing::info!("FTP connection to {} closed", self.host),
            Err(e) => tracing::warn!("Error closing FTP connection to {}: {}", self.host, e),
        }
    }
}

#[derive(Clone)]
pub struct DeliveryClient {
    connector: Arc<dyn FtpConnector>,
    overwrite_existing: bool,
}

impl DeliveryClient {
    pub fn new(connector: Arc<dyn FtpConnector>, overwrite_existing: bool) -> Self {
        Self {
            connector,
            overwrite_existing,
        }
    }

    /// Upload `buffer` as `remote_dir/filename`.
    ///
    /// Credentials are validated before anything touches the network. No
    /// retries are attempted.
    pub fn deliver(
        &self,
        buffer: &[u8],
        filename: &str,
        settings: &FtpSettings,
    ) -> Result<DeliveryReport, ExportError> {
        let credentials = FtpCredentials::try_from(settings)?;
        let mut session = ScopedSession::open(self.connector.as_ref(), &credentials)?;

        tracing::info!(stage = %Stage::Uploading, "Uploading {} ({} bytes)", filename, buffer.len());
        // Always change directory, the login directory need not be the root
        session.cwd(&credentials.remote_dir).map_err(|e| {
            ExportError::Transfer(format!(
                "remote directory {} is not accessible: {}",
                credentials.remote_dir, e
            ))
        })?;

        if !self.overwrite_existing
            && session
                .exists(filename)
                .map_err(|e| Stage::Uploading.fail(e))?
        {
            return Err(ExportError::Transfer(format!(
                "{} already exists and overwriting is disabled",
                credentials.remote_path(filename)
            )));
        }

        let sent = session
            .put(filename, buffer)
            .map_err(|e| Stage::Uploading.fail(e))?;
        if sent != buffer.len() as u64 {
            return Err(ExportError::Transfer(format!(
                "short write: {} of {} bytes sent",
                sent,
                buffer.len()
            )));
        }

        tracing::info!("Upload successful: {}", filename);
        Ok(DeliveryReport {
            filename: filename.to_string(),
            remote_path: credentials.remote_path(filename),
            bytes_transferred: sent,
        })
    }

    /// Connect, authenticate and look around without uploading anything.
    ///
    /// Directory and listing problems are reported in the result rather than
    /// as errors, so only configuration, connection and authentication
    /// failures are returned.
    pub fn probe(&self, settings: &FtpSettings) -> Result<ProbeReport, ExportError> {
        let credentials = FtpCredentials::try_from(settings)?;
        let mut session = ScopedSession::open(self.connector.as_ref(), &credentials)?;

        let current_directory = session
            .pwd()
            .map_err(|e| tracing::warn!("PWD failed: {}", e))
            .ok();

        let remote_dir_exists = match session.cwd(&credentials.remote_dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Remote directory {} not accessible: {}", credentials.remote_dir, e);
                false
            }
        };

        let sample_files = match session.list_names() {
            Ok(names) => names.into_iter().take(PROBE_SAMPLE_FILES).collect(),
            Err(e) => {
                tracing::warn!("Unable to list files: {}", e);
                Vec::new()
            }
        };

        tracing::info!("FTP connection test successful");
        Ok(ProbeReport {
            host: credentials.hostname.clone(),
            current_directory,
            remote_dir_exists,
            sample_files,
        })
    }
}
