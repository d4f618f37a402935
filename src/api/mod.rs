//! API handlers for the visitor export REST endpoints

pub mod export;
pub mod health;
pub mod openapi;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Export triggers
        .route("/cron-export", post(export::cron_export))
        .route(
            "/manual-export",
            get(export::manual_export).post(export::manual_export),
        )
        // Diagnostics
        .route("/test-ftp", get(export::test_ftp))
        .route("/generate-sample-csv", get(export::generate_sample_csv))
        .route("/sample.csv", get(export::sample_csv))
        .with_state(state);

    Router::new()
        .route("/", get(health::root))
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
