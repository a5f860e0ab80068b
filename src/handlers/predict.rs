//! Prediction handlers

use axum::{extract::State, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::explain::{explain, Explanation};
use crate::models::{PredictRequest, PredictionResult};
use crate::{AppResult, AppState};

/// Score one transaction
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<PredictionResult>> {
    let result = score(&state, &req, "predict")?;
    Ok(Json(result))
}

/// Score one transaction and describe the main drivers
pub async fn explain_prediction(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<Explanation>> {
    let result = score(&state, &req, "explain")?;
    Ok(Json(explain(result)))
}

fn score(state: &AppState, req: &PredictRequest, route: &'static str) -> AppResult<PredictionResult> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("score", %request_id, route);

    span.in_scope(|| -> AppResult<PredictionResult> {
        tracing::debug!("Received {} attribute(s)", req.features.len());

        let result = state.engine.predict(&req.features, Utc::now())?;

        tracing::info!(
            probability = result.fraud_probability,
            risk_level = result.risk_level,
            "Prediction served"
        );
        Ok(result)
    })
}
