//! Wait-time prediction endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::{extract::ApiJson, state::AppState};
use crate::types::{PredictRequest, SampleRecorded, SampleRequest, WaitTimeEstimate};

/// POST /predict/waittime - blend the model with recent history
pub async fn predict_wait_time(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PredictRequest>,
) -> Result<Json<WaitTimeEstimate>> {
    let deadline = state.deadline();
    let estimate = state
        .estimator()
        .estimate(request.queue_id, &request.context, &deadline)
        .await?;

    tracing::info!(
        "Estimated {:.1} min for queue {} (ml {:.1}, ma {:.1}, {} samples)",
        estimate.estimate_minutes,
        request.queue_id,
        estimate.ml_component,
        estimate.ma_component,
        estimate.samples_used
    );

    Ok(Json(estimate))
}

/// POST /predict/waittime/samples - record an observed wait
pub async fn record_sample(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SampleRequest>,
) -> Result<Json<SampleRecorded>> {
    let sample = request.into_sample();
    state.sample_store().append(&sample).await?;
    let samples = state.sample_store().count(&sample.queue_id).await?;

    tracing::debug!(
        "Recorded {:.1} min wait for queue {} ({} samples)",
        sample.observed_wait_minutes,
        sample.queue_id,
        samples
    );

    Ok(Json(SampleRecorded {
        queue_id: sample.queue_id,
        samples,
    }))
}
