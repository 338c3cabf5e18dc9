use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pems_sensorflow::Alert;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::pipeline::{AlertAnalysis, Pipeline};

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new()
        .route("/alerts/{id}/analysis", get(analysis))
        .route("/alerts/{id}/acknowledge", post(acknowledge))
}

#[derive(Debug, Deserialize)]
struct AcknowledgeRequest {
    #[serde(default)]
    actions_taken: Vec<String>,
}

async fn analysis(
    Path(id): Path<Uuid>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<AlertAnalysis>, ApiError> {
    // ---
    info!("GET /alerts/{}/analysis", id);
    Ok(Json(pipeline.alert_analysis(id).await?))
}

async fn acknowledge(
    Path(id): Path<Uuid>,
    State(pipeline): State<Pipeline>,
    Json(body): Json<AcknowledgeRequest>,
) -> Result<Json<Alert>, ApiError> {
    // ---
    info!("POST /alerts/{}/acknowledge", id);
    let actions: Vec<String> = body
        .actions_taken
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    Ok(Json(pipeline.acknowledge(id, &actions).await?))
}
