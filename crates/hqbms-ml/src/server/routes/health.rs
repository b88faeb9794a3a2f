//! Liveness, readiness and service info

use axum::{extract::State, http::StatusCode, Json};

use crate::server::state::AppState;
use crate::types::HealthResponse;

/// GET /health - probe every collaborator
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.health().await)
}

/// GET /ready - 200 once a model is loaded and the index answers
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /info - service description
pub async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "hqbms-ml",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Queue wait-time estimation and document question answering",
        "endpoints": {
            "GET /health": "Collaborator status",
            "GET /ready": "Readiness probe",
            "POST /predict/waittime": "Estimate the wait for a queue",
            "POST /predict/waittime/samples": "Record an observed wait",
            "POST /rag/query": "Answer a question from ingested documents",
            "POST /rag/ingest": "Chunk, embed and index a document",
            "DELETE /rag/documents/:doc_id": "Delete a document's chunks",
            "POST /models/reload": "Reload the wait-time model artifact"
        }
    }))
}
