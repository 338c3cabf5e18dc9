use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use pems_sensorflow::analytics::TemperatureUnit;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::houses::PeriodQuery;
use super::ApiError;
use crate::pipeline::{AnnualReport, MonthlyReport, Pipeline};

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new()
        .route("/houses/{id}/reports/monthly", get(house_monthly))
        .route("/houses/{id}/reports/annual", get(house_annual))
        .route("/branches/{branch}/reports/monthly", get(branch_monthly))
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    year: Option<i32>,
    month: Option<u32>,
    #[serde(default)]
    unit: TemperatureUnit,
}

impl ReportQuery {
    fn period(&self) -> PeriodQuery {
        PeriodQuery {
            year: self.year,
            month: self.month,
        }
    }
}

async fn house_monthly(
    Path(id): Path<Uuid>,
    Query(params): Query<ReportQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<MonthlyReport>, ApiError> {
    // ---
    let (year, month) = params.period().resolve(&pipeline);
    info!("GET /houses/{}/reports/monthly {}-{:02} {:?}", id, year, month, params.unit);
    Ok(Json(pipeline.monthly_report(id, year, month, params.unit).await?))
}

async fn house_annual(
    Path(id): Path<Uuid>,
    Query(params): Query<ReportQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<AnnualReport>, ApiError> {
    // ---
    let (year, _) = params.period().resolve(&pipeline);
    info!("GET /houses/{}/reports/annual {} {:?}", id, year, params.unit);
    Ok(Json(pipeline.annual_report(id, year, params.unit).await?))
}

async fn branch_monthly(
    Path(branch): Path<String>,
    Query(params): Query<ReportQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<MonthlyReport>, ApiError> {
    // ---
    let (year, month) = params.period().resolve(&pipeline);
    info!("GET /branches/{}/reports/monthly {}-{:02} {:?}", branch, year, month, params.unit);
    Ok(Json(
        pipeline
            .branch_monthly_report(&branch, year, month, params.unit)
            .await?,
    ))
}
