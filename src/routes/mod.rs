//! HTTP gateway (EMBP): sibling modules export subrouters, this module merges
//! them, attaches shared state and owns the error-to-response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;

use crate::feed::FeedError;
use crate::pipeline::{MissingChannel, Pipeline};
use crate::store::StoreError;

mod alerts;
mod health;
mod houses;
mod reports;

// ---

pub fn router(pipeline: Pipeline) -> Router {
    // ---
    Router::new()
        .merge(houses::router())
        .merge(reports::router())
        .merge(alerts::router())
        .merge(health::router())
        .with_state(pipeline)
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Handler error rendered as `{error, message}` JSON.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        // ---
        if let Some(err) = self.0.downcast_ref::<StoreError>() {
            return match err {
                StoreError::HouseNotFound(_)
                | StoreError::BranchNotFound(_)
                | StoreError::AlertNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                StoreError::AlreadyAcknowledged(_) => (StatusCode::CONFLICT, "already_acknowledged"),
                StoreError::MalformedAlert { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "malformed_alert")
                }
                StoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
            };
        }
        if self.0.downcast_ref::<MissingChannel>().is_some() {
            return (StatusCode::UNPROCESSABLE_ENTITY, "missing_channel");
        }
        match self.0.downcast_ref::<FeedError>() {
            Some(FeedError::InvalidMonth { .. }) => (StatusCode::BAD_REQUEST, "invalid_month"),
            Some(_) => (StatusCode::BAD_GATEWAY, "sensor_feed"),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (status, error) = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {:#}", error, self.0);
        } else {
            tracing::debug!("{}: {:#}", error, self.0);
        }
        let body = ErrorBody {
            error,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_status_mapping() {
        // ---
        let id = Uuid::nil();
        let status = |err: ApiError| err.status().0;
        assert_eq!(status(StoreError::HouseNotFound(id).into()), StatusCode::NOT_FOUND);
        assert_eq!(status(StoreError::AlreadyAcknowledged(id).into()), StatusCode::CONFLICT);
        assert_eq!(
            status(StoreError::BranchNotFound("Nowhere".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(MissingChannel::House(id).into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status(MissingChannel::Branch("North".to_string()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(FeedError::InvalidMonth { year: 2025, month: 13 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(anyhow::anyhow!("boom").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
