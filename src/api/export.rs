//! Export trigger, probe and preview endpoints

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppResult, ExportError, FailureKind},
    models::{DeliveryReport, ExportQuery, ProbeReport},
    services::export::{ExportOutcome, Trigger},
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct FailureDetails {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ExportError> for FailureDetails {
    fn from(e: &ExportError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Structured result of an export invocation
#[derive(Debug, Serialize, ToSchema)]
pub struct ExportResult {
    /// `success` or `error`
    pub status: String,
    pub message: String,
    pub invocation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_details: Option<DeliveryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetails>,
}

/// Structured result of a connectivity probe
#[derive(Debug, Serialize, ToSchema)]
pub struct ProbeResult {
    pub status: String,
    pub message: String,
    pub invocation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ProbeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetails>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewResponse {
    pub status: String,
    /// Filename an export of this window would use
    pub current_filename: String,
    pub record_count: usize,
    /// First 200 characters of the CSV
    pub current_csv_preview: String,
    /// Data rows in a full historical series
    pub historical_csv_lines: usize,
    pub message: String,
}

fn export_response(outcome: ExportOutcome) -> (StatusCode, Json<ExportResult>) {
    let timestamp = Utc::now();
    match outcome.result {
        Ok(report) => (
            StatusCode::OK,
            Json(ExportResult {
                status: "success".to_string(),
                message: "CSV export completed successfully".to_string(),
                invocation_id: outcome.invocation_id,
                timestamp,
                filename: outcome.filename,
                upload_details: Some(report),
                failure: None,
            }),
        ),
        Err(e) => (
            e.kind().status_code(),
            Json(ExportResult {
                status: "error".to_string(),
                message: "CSV export failed".to_string(),
                invocation_id: outcome.invocation_id,
                timestamp,
                filename: outcome.filename,
                upload_details: None,
                failure: Some(FailureDetails::from(&e)),
            }),
        ),
    }
}

async fn trigger_export(
    state: &AppState,
    trigger: Trigger,
    query: &ExportQuery,
) -> (StatusCode, Json<ExportResult>) {
    let export = &state.services.export;
    let outcome = match export.resolve_request(query) {
        Ok(request) => export.run(trigger, request).await,
        Err(e) => {
            tracing::error!(%trigger, "Rejected export request: {}", e);
            ExportOutcome {
                invocation_id: Uuid::new_v4(),
                filename: None,
                result: Err(e),
            }
        }
    };
    export_response(outcome)
}

/// Scheduled export, invoked by the cron trigger
#[utoipa::path(
    post,
    path = "/api/cron-export",
    tag = "export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV delivered", body = ExportResult),
        (status = 400, description = "Invalid sample window", body = ExportResult),
        (status = 500, description = "Configuration error", body = ExportResult),
        (status = 502, description = "FTP connection, login or transfer failed", body = ExportResult)
    )
)]
pub async fn cron_export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> (StatusCode, Json<ExportResult>) {
    trigger_export(&state, Trigger::Scheduled, &query).await
}

/// Operator-initiated export, same contract as the scheduled one
#[utoipa::path(
    get,
    path = "/api/manual-export",
    tag = "export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV delivered", body = ExportResult),
        (status = 400, description = "Invalid sample window", body = ExportResult),
        (status = 500, description = "Configuration error", body = ExportResult),
        (status = 502, description = "FTP connection, login or transfer failed", body = ExportResult)
    )
)]
pub async fn manual_export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> (StatusCode, Json<ExportResult>) {
    trigger_export(&state, Trigger::Manual, &query).await
}

/// FTP connectivity probe
#[utoipa::path(
    get,
    path = "/api/test-ftp",
    tag = "export",
    responses(
        (status = 200, description = "Connected and logged in", body = ProbeResult),
        (status = 500, description = "Configuration error", body = ProbeResult),
        (status = 502, description = "Connection or login failed", body = ProbeResult)
    )
)]
pub async fn test_ftp(State(state): State<AppState>) -> (StatusCode, Json<ProbeResult>) {
    let (invocation_id, result) = state.services.export.probe().await;
    let timestamp = Utc::now();

    match result {
        Ok(report) => (
            StatusCode::OK,
            Json(ProbeResult {
                status: "success".to_string(),
                message: "FTP connection test successful".to_string(),
                invocation_id,
                timestamp,
                details: Some(report),
                failure: None,
            }),
        ),
        Err(e) => (
            e.kind().status_code(),
            Json(ProbeResult {
                status: "error".to_string(),
                message: "FTP connection test failed".to_string(),
                invocation_id,
                timestamp,
                details: None,
                failure: Some(FailureDetails::from(&e)),
            }),
        ),
    }
}

/// Preview generated CSV without delivering it
#[utoipa::path(
    get,
    path = "/api/generate-sample-csv",
    tag = "export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Sample generated", body = PreviewResponse),
        (status = 400, description = "Invalid sample window", body = crate::error::ErrorResponse)
    )
)]
pub async fn generate_sample_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<PreviewResponse>> {
    let export = &state.services.export;
    let request = export.resolve_request(&query)?;
    let preview = export.preview(&request)?;

    Ok(Json(PreviewResponse {
        status: "success".to_string(),
        current_filename: preview.filename,
        record_count: preview.record_count,
        current_csv_preview: preview.csv_preview,
        historical_csv_lines: preview.historical_csv_lines,
        message: "Sample CSV data generated successfully".to_string(),
    }))
}

/// Download the CSV an export would deliver
#[utoipa::path(
    get,
    path = "/api/sample.csv",
    tag = "export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV document", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid sample window", body = crate::error::ErrorResponse)
    )
)]
pub async fn sample_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let export = &state.services.export;
    let request = export.resolve_request(&query)?;
    let (filename, buffer) = export.sample_csv(&request)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
        ],
        buffer,
    ))
}
