// src/routes/health.rs
//! Liveness endpoint for the `pems-sensorflow` service.
//!
//! Used by container orchestrators and CI to check that the process is up and
//! answering HTTP. It never touches the database or the sensor feed.
//! EMBP: exports a single subrouter to the `routes` gateway.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Subrouter with the `/health` route, generic over the gateway's state.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
