//! HTTP server
//!
//! Combines the index page, the vehicle API and static assets.

use std::future::Future;

use axum::{extract::Request, routing::get_service, Router, ServiceExt};
use owo_colors::OwoColorize;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    normalize_path::{NormalizePath, NormalizePathLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    config::ServerConfig, database::Database, errors::VehicleApiError, vehicles::vehicle_routes,
};

pub struct HttpServer {
    config: ServerConfig,
    app: NormalizePath<Router>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, db: Database) -> Self {
        let router = Self::build_router(&config, db);
        // Trailing slashes are trimmed before routing, so `/api/vehicles/`
        // reaches the same handler as `/api/vehicles`.
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);
        Self { config, app }
    }

    fn build_router(config: &ServerConfig, db: Database) -> Router {
        Router::new()
            .route("/", get_service(ServeFile::new(&config.index_file)))
            .nest("/api/vehicles", vehicle_routes(db))
            // Anything unmatched is looked up in the asset directory
            .fallback_service(ServeDir::new(&config.static_dir))
            .layer(TraceLayer::new_for_http())
    }

    /// Get the service (for testing)
    pub fn app(self) -> NormalizePath<Router> {
        self.app
    }

    /// Serve until `shutdown` resolves, then let in-flight requests finish
    pub async fn run<F>(self, shutdown: F) -> Result<(), VehicleApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        info!("Listening on {}", listener.local_addr()?);
        println!(
            "{}",
            format!("Server is running on http://localhost:{} 🚀", self.config.port).blue()
        );

        axum::serve(listener, ServiceExt::<Request>::into_make_service(self.app))
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
