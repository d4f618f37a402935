//! Business logic services

pub mod csv_encoder;
pub mod export;
pub mod ftp;
pub mod generator;

use std::sync::Arc;

use crate::{
    config::{ExportConfig, FtpSettings},
    error::AppResult,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub export: export::ExportService,
}

impl Services {
    /// Create all services, delivering through `connector`
    pub fn new(
        ftp: FtpSettings,
        export_config: ExportConfig,
        connector: Arc<dyn ftp::FtpConnector>,
    ) -> AppResult<Self> {
        Ok(Self {
            export: export::ExportService::new(ftp, export_config, connector)?,
        })
    }
}
