//! HTTP routers for the word search service and for a backend server.
//!
//! Search and simulation are blocking, so handlers move them onto the blocking thread pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::backend::remote::{ErrorBody, SubmitRequest, SubmitResponse, HEALTH_PATH, SUBMIT_PATH};
use crate::backend::{Backend, StatevectorBackend};
use crate::errors::BackendError;
use crate::service::{SearchResponse, SearchService, ServiceError};

/// Routes of the search service: `POST /search_word` and `GET /health`.
pub fn search_router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/search_word", post(search_word))
        .route(HEALTH_PATH, get(health))
        .with_state(service)
}

/// Routes of a backend server: `POST /v1/submit` and `GET /health`.
pub fn backend_router(backend: Arc<StatevectorBackend<f64>>) -> Router {
    Router::new()
        .route(SUBMIT_PATH, post(submit))
        .route(HEALTH_PATH, get(health))
        .with_state(backend)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn search_word(
    State(service): State<Arc<SearchService>>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = tokio::task::spawn_blocking(move || service.handle_body(&body))
        .await
        .map_err(|err| ApiError::internal(err.to_string()))??;
    Ok(Json(response))
}

async fn submit(
    State(backend): State<Arc<StatevectorBackend<f64>>>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let request: SubmitRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
    let counts = tokio::task::spawn_blocking(move || {
        backend.submit(&request.circuit, request.shots)
    })
    .await
    .map_err(|err| ApiError::internal(err.to_string()))??;
    Ok(Json(SubmitResponse { counts }))
}

/// An error rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(error = %err, "Search request failed.");
        }
        Self::new(status, err.to_string())
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        let status = match err {
            BackendError::MalformedCircuit(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
