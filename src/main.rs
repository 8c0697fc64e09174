//! Vehicle API server

use tokio::signal;
use tracing::{error, info};

use vehicle_api::config::AppConfig;
use vehicle_api::database::Database;
use vehicle_api::errors::VehicleApiError;
use vehicle_api::server::HttpServer;

#[tokio::main]
async fn main() -> Result<(), VehicleApiError> {
    // A missing .env file is fine; the environment may already be set
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;

    let db = Database::connect_lazy(&config.database)?;
    let server = HttpServer::new(config.server, db.clone());

    let result = server.run(shutdown_signal()).await;
    if let Err(e) = &result {
        error!("Server error: {}", e);
    }

    db.close().await;
    result
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
