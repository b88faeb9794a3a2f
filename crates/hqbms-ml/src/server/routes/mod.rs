//! HTTP routes for the ML service

pub mod health;
pub mod models;
pub mod predict;
pub mod rag;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .route("/info", get(health::info))
        // Wait-time estimation
        .route("/predict/waittime", post(predict::predict_wait_time))
        .route("/predict/waittime/samples", post(predict::record_sample))
        // Document question answering
        .route("/rag/query", post(rag::query))
        .route(
            "/rag/ingest",
            post(rag::ingest).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/rag/documents/:doc_id", delete(rag::delete_document))
        // Model management
        .route("/models/reload", post(models::reload_model))
}
