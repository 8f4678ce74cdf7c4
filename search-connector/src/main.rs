//! Search Connector Main Entry Point
//!
//! Maintenance binary: creates, drops or migrates the index of one type
//! declared in a JSON catalog.

use dotenv::dotenv;
use search_connector::{ConnectorSettings, Dependencies};
use search_connector_repository::ConnectorError;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("search_connector=info,search_connector_repository=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "search-connector",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "search-connector",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), ConnectorError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    let settings = ConnectorSettings::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    info!(action = ?settings.action, "Starting search connector");

    let Dependencies {
        mut connector,
        action,
    } = match Dependencies::new(settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let outcome = action.execute(&mut connector).await;
    let closed = connector.close().await;
    if let (Err(_), Err(e)) = (&outcome, &closed) {
        error!(error = %e, "Failed to close connector");
    }

    match outcome.and(closed) {
        Ok(()) => {
            info!(action = ?action, "Search connector completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(action = ?action, error = %e, "Search connector failed");
            Err(e)
        }
    }
}
