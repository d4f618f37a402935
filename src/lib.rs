//! Visitor Export
//!
//! Synthesizes visitor count samples, encodes them as CSV and delivers them
//! to an FTP/FTPS server. Runs are triggered over HTTP by an external
//! scheduler or an operator.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ExportError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
