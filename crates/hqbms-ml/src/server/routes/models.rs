//! Model management endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::ModelInfo;

/// POST /models/reload - reload the wait-time artifact from disk
///
/// A failed reload keeps the previous model active.
pub async fn reload_model(State(state): State<AppState>) -> Result<Json<ModelInfo>> {
    let info = state.registry().load().await?;
    Ok(Json(info))
}
