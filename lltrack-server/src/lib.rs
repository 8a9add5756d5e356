//! lltrack-server library
//!
//! Record store, label extraction, ingest pipeline and HTTP API for the
//! LoadLock tracker. Both binaries (`lltrack-server`, `lltrack-scan`) build
//! on this crate; the integration tests drive [`build_router`] directly.

pub mod api;
pub mod db;
pub mod error;
pub mod services;
pub mod startup;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use lltrack_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use services::Ingestor;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Upload pipeline (vision client + uploads folder)
    pub ingestor: Arc<Ingestor>,
    /// Request body cap for uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: SqlitePool, ingestor: Ingestor) -> Self {
        Self {
            db,
            ingestor: Arc::new(ingestor),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(api::ui_routes())
        .merge(api::health_routes())
        .merge(api::status_routes())
        .merge(api::unit_routes())
        .merge(api::sample_routes())
        .merge(api::upload_routes().layer(upload_limit))
        .merge(api::export_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
