//! Export and delivery models

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::visitor_record::WindowKind;

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryReport {
    pub filename: String,
    /// Full remote path, `remote_dir/filename`
    pub remote_path: String,
    pub bytes_transferred: u64,
}

/// Outcome of a successful connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProbeReport {
    pub host: String,
    /// Working directory right after login, if the server reported one
    pub current_directory: Option<String>,
    /// Whether the configured remote directory could be entered
    pub remote_dir_exists: bool,
    /// Up to five entries of the directory listing
    pub sample_files: Vec<String>,
}

/// Query parameters accepted by the export and preview endpoints
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Reference time (YYYY-MM-DDTHH:MM:SS, local to the configured zone)
    pub reference: Option<String>,
    /// Sample window: current or series
    pub window: Option<WindowKind>,
    /// Hours covered by a series window
    pub hours_back: Option<i64>,
}
