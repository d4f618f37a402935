//! Visitor Export Server
//!
//! HTTP entry points for the scheduled CSV export.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visitor_export::{
    api,
    config::{AppConfig, LoggingConfig},
    services::{ftp::SuppaFtpConnector, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config.logging);

    tracing::info!("Starting Visitor Export Server v{}", env!("CARGO_PKG_VERSION"));

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let connector = SuppaFtpConnector::new(Duration::from_secs(config.ftp.connect_timeout_secs));
    let services = Services::new(
        config.ftp.clone(),
        config.export.clone(),
        Arc::new(connector),
    )?;

    if !config.ftp.has_hostname() {
        tracing::warn!("FTP_HOSTNAME is not set; exports will fail until it is configured");
    }

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    let addr = SocketAddr::new(server_host.parse()?, server_port);
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("visitor_export={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
