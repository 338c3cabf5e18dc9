use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Datelike;
use pems_sensorflow::analytics::Insights;
use pems_sensorflow::MonthSummary;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::pipeline::{HourlyPatterns, Pipeline, Predictions};

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new()
        .route("/houses/{id}/insights", get(insights))
        .route("/houses/{id}/predictions", get(predictions))
        .route("/houses/{id}/hourly", get(hourly))
        .route("/houses/{id}/annual", get(annual))
}

/// `year`/`month` query; each defaults to the current one.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PeriodQuery {
    pub fn resolve(&self, pipeline: &Pipeline) -> (i32, u32) {
        let now = pipeline.now();
        (
            self.year.unwrap_or_else(|| now.year()),
            self.month.unwrap_or_else(|| now.month()),
        )
    }
}

/// Insight groups; `insights` is `null` when there was nothing to report.
#[derive(Serialize)]
struct InsightsResponse {
    house_id: Uuid,
    insights: Option<Insights>,
}

async fn insights(
    Path(id): Path<Uuid>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<InsightsResponse>, ApiError> {
    // ---
    info!("GET /houses/{}/insights", id);
    let insights = pipeline.insights(id).await?;
    Ok(Json(InsightsResponse {
        house_id: id,
        insights,
    }))
}

async fn predictions(
    Path(id): Path<Uuid>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<Predictions>, ApiError> {
    // ---
    info!("GET /houses/{}/predictions", id);
    Ok(Json(pipeline.predictions(id).await?))
}

async fn hourly(
    Path(id): Path<Uuid>,
    Query(params): Query<PeriodQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<HourlyPatterns>, ApiError> {
    // ---
    let (year, month) = params.resolve(&pipeline);
    info!("GET /houses/{}/hourly year={} month={}", id, year, month);
    Ok(Json(pipeline.hourly(id, year, month).await?))
}

async fn annual(
    Path(id): Path<Uuid>,
    Query(params): Query<PeriodQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<Vec<MonthSummary>>, ApiError> {
    // ---
    let (year, _) = params.resolve(&pipeline);
    info!("GET /houses/{}/annual year={}", id, year);
    Ok(Json(pipeline.annual(id, year).await?))
}
