//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{export, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Visitor Export API",
        version = "1.0.0",
        description = "Scheduled export of visitor counts as CSV to an FTP/FTPS server",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::root,
        health::health_check,
        // Export
        export::cron_export,
        export::manual_export,
        export::test_ftp,
        export::generate_sample_csv,
        export::sample_csv,
    ),
    components(
        schemas(
            // Export
            export::ExportResult,
            export::ProbeResult,
            export::PreviewResponse,
            export::FailureDetails,
            crate::models::DeliveryReport,
            crate::models::ProbeReport,
            crate::models::ExportQuery,
            crate::models::WindowKind,
            crate::error::FailureKind,
            // Health
            health::HealthResponse,
            health::BannerResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "export", description = "CSV export, FTP probe and preview")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
