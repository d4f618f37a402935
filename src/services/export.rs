//! Export pipeline: generate, encode, deliver
//!
//! One call to [`ExportService::run`] is one invocation. Nothing is shared
//! between invocations apart from the read-only configuration.

use std::{fmt, sync::Arc};

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::{ExportConfig, FtpSettings},
    error::{AppError, AppResult, ExportError},
    models::{
        visitor_record::export_filename, DeliveryReport, ExportJob, ExportQuery, ProbeReport,
        SampleWindow, WindowKind,
    },
    services::{
        csv_encoder,
        ftp::{DeliveryClient, FtpConnector},
        generator::VisitorDataGenerator,
    },
};

const PREVIEW_CHARS: usize = 200;

/// What started an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        })
    }
}

/// Resolved trigger parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub reference: Option<NaiveDateTime>,
    pub window: SampleWindow,
}

/// Result of one export invocation
#[derive(Debug)]
pub struct ExportOutcome {
    pub invocation_id: Uuid,
    /// Absent when the run failed before a job was built
    pub filename: Option<String>,
    pub result: Result<DeliveryReport, ExportError>,
}

/// Generator and encoder output, without delivery
#[derive(Debug)]
pub struct Preview {
    pub filename: String,
    pub record_count: usize,
    pub csv_preview: String,
    pub historical_csv_lines: usize,
}

#[derive(Clone)]
pub struct ExportService {
    ftp: Arc<FtpSettings>,
    config: ExportConfig,
    zone: Tz,
    generator: VisitorDataGenerator,
    delivery: DeliveryClient,
}

impl ExportService {
    pub fn new(
        ftp: FtpSettings,
        config: ExportConfig,
        connector: Arc<dyn FtpConnector>,
    ) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let zone = config
            .zone()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let generator = VisitorDataGenerator::from_config(&config)?;
        let delivery = DeliveryClient::new(connector, config.overwrite_existing);

        Ok(Self {
            ftp: Arc::new(ftp),
            config,
            zone,
            generator,
            delivery,
        })
    }

    /// Current wall-clock time in the configured zone
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.zone).naive_local()
    }

    /// Turn query parameters into a request, filling in configured defaults
    pub fn resolve_request(&self, query: &ExportQuery) -> Result<ExportRequest, ExportError> {
        let reference = query
            .reference
            .as_deref()
            .map(parse_reference)
            .transpose()?;

        let window = match query.window.unwrap_or(self.config.default_window) {
            WindowKind::Current => SampleWindow::Current,
            WindowKind::Series => SampleWindow::Series {
                hours_back: query.hours_back.unwrap_or(self.config.hours_back),
            },
        };

        Ok(ExportRequest { reference, window })
    }

    /// Generate the records and target filename for a request
    pub fn build_job(&self, request: &ExportRequest) -> Result<ExportJob, ExportError> {
        let reference = request.reference.unwrap_or_else(|| self.now());
        let records = self.generator.generate(reference, request.window, &mut rand::thread_rng())?;

        Ok(ExportJob {
            reference,
            records,
            filename: export_filename(reference),
        })
    }

    /// Run one invocation end to end. Failures are logged and returned in
    /// the outcome, never retried.
    pub async fn run(&self, trigger: Trigger, request: ExportRequest) -> ExportOutcome {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("export", %invocation_id, %trigger);

        async move {
            tracing::info!("Starting CSV export");

            let job = match self.build_job(&request) {
                Ok(job) => job,
                Err(e) => return self.failed(invocation_id, None, e),
            };
            tracing::info!("Generated {} records for {}", job.records.len(), job.filename);

            let buffer = match csv_encoder::encode(&job.records) {
                Ok(buffer) => buffer,
                Err(e) => return self.failed(invocation_id, Some(job.filename), e),
            };

            let client = self.delivery.clone();
            let ftp = Arc::clone(&self.ftp);
            let filename = job.filename.clone();
            let current = tracing::Span::current();
            let delivered = tokio::task::spawn_blocking(move || {
                current.in_scope(|| client.deliver(&buffer, &filename, &ftp))
            })
            .await
            .unwrap_or_else(|e| Err(ExportError::Transfer(format!("delivery task aborted: {}", e))));

            match delivered {
                Ok(report) => {
                    tracing::info!(
                        "CSV export successful: {} ({} bytes)",
                        report.remote_path,
                        report.bytes_transferred
                    );
                    ExportOutcome {
                        invocation_id,
                        filename: Some(job.filename),
                        result: Ok(report),
                    }
                }
                Err(e) => self.failed(invocation_id, Some(job.filename), e),
            }
        }
        .instrument(span)
        .await
    }

    /// Connectivity check against the configured endpoint
    pub async fn probe(&self) -> (Uuid, Result<ProbeReport, ExportError>) {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("probe", %invocation_id);

        let client = self.delivery.clone();
        let ftp = Arc::clone(&self.ftp);
        let blocking_span = span.clone();
        let result = tokio::task::spawn_blocking(move || blocking_span.in_scope(|| client.probe(&ftp)))
            .await
            .unwrap_or_else(|e| Err(ExportError::Connection(format!("probe task aborted: {}", e))));

        if let Err(e) = &result {
            span.in_scope(|| tracing::error!(kind = ?e.kind(), "FTP connection test failed: {}", e));
        }
        (invocation_id, result)
    }

    /// CSV for a request without delivering it
    pub fn sample_csv(&self, request: &ExportRequest) -> Result<(String, Vec<u8>), ExportError> {
        let job = self.build_job(request)?;
        let buffer = csv_encoder::encode(&job.records)?;
        Ok((job.filename, buffer))
    }

    /// Preview of the requested window plus the size of a full series
    pub fn preview(&self, request: &ExportRequest) -> Result<Preview, ExportError> {
        let job = self.build_job(request)?;
        let buffer = csv_encoder::encode(&job.records)?;

        let historical = self.build_job(&ExportRequest {
            reference: Some(job.reference),
            window: SampleWindow::Series {
                hours_back: self.config.hours_back,
            },
        })?;

        Ok(Preview {
            record_count: job.records.len(),
            csv_preview: csv_encoder::preview(&buffer, PREVIEW_CHARS),
            historical_csv_lines: historical.records.len(),
            filename: job.filename,
        })
    }

    fn failed(&self, invocation_id: Uuid, filename: Option<String>, error: ExportError) -> ExportOutcome {
        tracing::error!(kind = ?error.kind(), "CSV export failed: {}", error);
        ExportOutcome {
            invocation_id,
            filename,
            result: Err(error),
        }
    }
}

/// Accepts `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM` or a space instead of `T`
fn parse_reference(raw: &str) -> Result<NaiveDateTime, ExportError> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| ExportError::Generation(format!("invalid reference time: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ftp::transport::{MockFtpConnector, MockFtpSession};
    use chrono::NaiveDate;

    fn ftp_settings() -> FtpSettings {
        FtpSettings {
            hostname: Some("ftp.example.com".into()),
            username: Some("exporter".into()),
            password: Some("secret".into()),
            ..Default::default()
        }
    }

    fn service(connector: MockFtpConnector) -> ExportService {
        ExportService::new(ftp_settings(), ExportConfig::default(), Arc::new(connector)).unwrap()
    }

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 23)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_request_defaults() {
        let svc = service(MockFtpConnector::new());
        let request = svc.resolve_request(&ExportQuery::default()).unwrap();
        assert_eq!(request.reference, None);
        assert_eq!(request.window, SampleWindow::Current);

        let request = svc
            .resolve_request(&ExportQuery {
                reference: Some("2024-01-23T09:15:00".into()),
                window: Some(WindowKind::Series),
                hours_back: None,
            })
            .unwrap();
        assert_eq!(request.reference, Some(reference()));
        assert_eq!(request.window, SampleWindow::Series { hours_back: 24 });
    }

    #[test]
    fn test_invalid_generator_config_fails_construction() {
        for config in [
            ExportConfig { interval_minutes: 7, ..Default::default() },
            ExportConfig { variation: 1.5, ..Default::default() },
            ExportConfig { max_hours_back: i64::MAX, ..Default::default() },
            ExportConfig { hours_back: 0, ..Default::default() },
        ] {
            let result = ExportService::new(ftp_settings(), config, Arc::new(MockFtpConnector::new()));
            assert!(matches!(result, Err(AppError::Internal(_))));
        }
    }

    #[test]
    fn test_resolve_request_rejects_bad_reference() {
        let svc = service(MockFtpConnector::new());
        let err = svc
            .resolve_request(&ExportQuery {
                reference: Some("yesterday".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ExportError::Generation(_)));
    }

    #[test]
    fn test_preview() {
        let svc = service(MockFtpConnector::new());
        let preview = svc
            .preview(&ExportRequest {
                reference: Some(reference()),
                window: SampleWindow::Current,
            })
            .unwrap();

        assert_eq!(preview.filename, "visitor_data_20240123_0915.csv");
        assert_eq!(preview.record_count, 1);
        assert_eq!(preview.historical_csv_lines, 96);
        assert!(preview
            .csv_preview
            .contains("2024-01-23 09:15:00,2024-01-23,09:15,"));
    }

    #[tokio::test]
    async fn test_run_delivers_encoded_job() {
        let mut session = MockFtpSession::new();
        session.expect_login().returning(|_, _| Ok(()));
        session
            .expect_put()
            .withf(|name, data| {
                name == "visitor_data_20240123_0915.csv"
                    && data.starts_with(b"timestamp,date,time,visitor_count,day_of_week,hour\n")
            })
            .times(1)
            .returning(|_, data| Ok(data.len() as u64));
        session.expect_quit().times(1).returning(|| Ok(()));

        let mut connector = MockFtpConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move |_| Ok(Box::new(session) as Box<dyn crate::services::ftp::FtpSession>));

        let outcome = service(connector)
            .run(
                Trigger::Manual,
                ExportRequest {
                    reference: Some(reference()),
                    window: SampleWindow::Current,
                },
            )
            .await;

        let report = outcome.result.unwrap();
        assert_eq!(outcome.filename.as_deref(), Some("visitor_data_20240123_0915.csv"));
        assert!(report.bytes_transferred > 52);
    }

    #[tokio::test]
    async fn test_run_generation_error_skips_network() {
        let mut connector = MockFtpConnector::new();
        connector.expect_connect().never();

        let outcome = service(connector)
            .run(
                Trigger::Scheduled,
                ExportRequest {
                    reference: Some(reference()),
                    window: SampleWindow::Series { hours_back: -3 },
                },
            )
            .await;

        assert_eq!(outcome.filename, None);
        assert!(matches!(outcome.result, Err(ExportError::Generation(_))));
    }
}
