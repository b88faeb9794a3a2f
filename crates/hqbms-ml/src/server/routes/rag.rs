//! Document question answering endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::{extract::ApiJson, state::AppState};
use crate::types::{DeleteDocumentResponse, IngestRequest, IngestResult, QueryRequest, RagAnswer};

/// POST /rag/query - answer a question from indexed chunks
pub async fn query(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QueryRequest>,
) -> Result<Json<RagAnswer>> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\"", request.question);

    let deadline = state.deadline();
    let answer = state
        .engine()
        .query(&request.question, request.top_k, &deadline)
        .await?;

    tracing::info!(
        "Answered with {} sources (confidence {:.2}) in {}ms",
        answer.sources.len(),
        answer.confidence,
        start.elapsed().as_millis()
    );

    Ok(Json(answer))
}

/// POST /rag/ingest - chunk, embed and index raw text
pub async fn ingest(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IngestRequest>,
) -> Result<Json<IngestResult>> {
    let deadline = state.deadline();
    let result = state.ingestor().ingest_request(request, &deadline).await?;
    Ok(Json(result))
}

/// DELETE /rag/documents/:doc_id - remove a document's chunks
pub async fn delete_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>> {
    let doc_id = uuid::Uuid::parse_str(doc_id.trim())
        .map_err(|e| Error::validation(format!("doc_id '{}' is not a UUID: {}", doc_id, e)))?;

    let chunks_deleted = state.ingestor().delete_document(&doc_id).await?;
    Ok(Json(DeleteDocumentResponse {
        doc_id,
        chunks_deleted,
    }))
}
