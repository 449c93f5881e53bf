pub mod anpr_controller;

#[cfg(test)]
mod tests;

use crate::audit::FileAuditLog;
use crate::config::Config;
use crate::error::Error;
use crate::ingest::Ingestor;
use crate::storage::{CaptureIndexer, ImageWriter, NoOverlay, PlateOverlay, StorageLayout, TextOverlay};
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::info;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    pub indexer: Arc<CaptureIndexer>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidSegment { .. } | Error::Config(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            _ => ApiError {
                message: err.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            },
        }
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

pub struct RestApi {
    config: Config,
    state: AppState,
}

impl RestApi {
    pub fn new(config: &Config) -> Result<Self> {
        let storage = &config.storage;
        let layout = StorageLayout::new(&storage.root, storage.lane_count);

        let overlay: Arc<dyn PlateOverlay> = match &storage.overlay_font {
            Some(font) => {
                info!("Stamping plates with font {}", font.display());
                Arc::new(TextOverlay::from_file(font)?)
            }
            None => Arc::new(NoOverlay),
        };

        let audit = Arc::new(FileAuditLog::new(&layout.log_dir()));
        let indexer = CaptureIndexer::new(&storage.root, &storage.normalized_mount_prefix());
        let ingestor = Ingestor::new(layout, ImageWriter::new(overlay), audit);

        Ok(Self {
            config: config.clone(),
            state: AppState {
                ingestor: Arc::new(ingestor),
                indexer: Arc::new(indexer),
            },
        })
    }

    /// Build the application router
    pub fn router(&self) -> Router {
        // Create a CORS layer that allows all origins and preflight requests
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(false)
            .max_age(Duration::from_secs(3600));

        Router::new()
            .route("/anpr", post(anpr_controller::upload_capture))
            .route("/api/anpr/capturas", get(anpr_controller::list_captures))
            .with_state(self.state.clone())
            // Captured images, read only
            .nest_service(
                &self.config.storage.normalized_mount_prefix(),
                ServeDir::new(&self.config.storage.root),
            )
            .layer(DefaultBodyLimit::max(self.config.api.max_body_bytes))
            .layer(cors)
    }

    pub async fn run(&self) -> Result<()> {
        let app = self.router();

        // Build the server address
        let addr = self.config.api.address.clone() + ":" + &self.config.api.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        info!("API server listening on {}", addr);
        info!(
            "Serving captures from {} under {}",
            self.config.storage.root.display(),
            self.config.storage.normalized_mount_prefix()
        );

        let listener = TcpListener::bind(addr).await?;

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
