//! API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::api::AppState;
use crate::query::Query;
use crate::types::{Payload, Vector};
use crate::Error;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Handler error carrying the mapped status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, kind: &str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                kind: kind.to_string(),
            },
        }
    }
}

/// Map core errors to HTTP statuses
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::ReferenceNotFound(_) => StatusCode::NOT_FOUND,
        Error::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, kind = err.kind(), "Query failed");
        } else {
            tracing::debug!(error = %err, kind = err.kind(), "Query rejected");
        }
        ApiError::new(status, err.kind(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collection: state.service.collection().to_string(),
        model: state.service.embedder().model_name().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub collection: String,
    pub model: String,
}

/// Resolve a query and return ranked matches
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<Query>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let start = Instant::now();
    let Json(query) = payload?;

    let points = state.service.resolve_and_search(&query).await?;

    let results = points
        .into_iter()
        .map(|p| QueryResult {
            id: p.id.to_string(),
            score: p.score,
            payload: p.payload,
        })
        .collect();

    let took_ms = start.elapsed().as_millis() as u64;

    Ok(Json(QueryResponse { results, took_ms }))
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
    pub took_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// Build the query vector without searching
pub async fn query_vector(
    State(state): State<AppState>,
    payload: Result<Json<Query>, JsonRejection>,
) -> Result<Json<QueryVectorResponse>, ApiError> {
    let Json(query) = payload?;
    let vector = state.service.build_query_vector(&query).await?;

    Ok(Json(QueryVectorResponse {
        dimension: vector.len(),
        vector,
    }))
}

#[derive(Debug, Serialize)]
pub struct QueryVectorResponse {
    pub vector: Vector,
    pub dimension: usize,
}

/// Graph labels present in the index
pub async fn graphs(State(state): State<AppState>) -> Result<Json<GraphsResponse>, ApiError> {
    let graphs = state.catalog.list_graphs().await?;
    Ok(Json(GraphsResponse { graphs }))
}

#[derive(Debug, Serialize)]
pub struct GraphsResponse {
    pub graphs: Vec<String>,
}
