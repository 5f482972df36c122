//! API request handlers

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::api::types::ApiResponse;
use crate::api::types::HealthResponse;
use crate::api::types::SearchHit;
use crate::api::types::SearchRequest;
use crate::api::types::SearchResponse;
use crate::errors::ErrorKind;
use crate::errors::VerseRagError;
use crate::rag::EngineSlot;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineSlot>,
    /// Hits scoring below this are not returned
    pub relevance_threshold: f32,
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let (ready, units) = match state.engine.get() {
        Ok(engine) => (true, engine.len()),
        Err(_) => (false, 0),
    };
    Json(ApiResponse::success(HealthResponse {
        status: state.engine.status().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ready,
        units,
    }))
}

/// Verse search (POST /api/search)
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResponse> {
    let request_id = Uuid::new_v4();
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(%request_id, "Rejected search body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "Request body must be JSON of the form {\"query\": \"...\"}",
                )),
            );
        }
    };
    info!(%request_id, "POST /api/search ({} chars)", req.query.chars().count());

    let engine = match state.engine.get() {
        Ok(engine) => engine,
        Err(e) => return error_response(request_id, &e),
    };

    let started = Instant::now();
    let query = req.query.clone();
    let outcome = tokio::task::spawn_blocking(move || engine.search(&query)).await;

    let results = match outcome {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => return error_response(request_id, &e),
        Err(e) => {
            error!(%request_id, "Search task panicked: {}", e);
            return error_response(
                request_id,
                &VerseRagError::Inference("search task failed".to_string()),
            );
        }
    };

    let hits: Vec<SearchHit> = results
        .into_iter()
        .filter(|r| r.score >= state.relevance_threshold)
        .map(SearchHit::from)
        .collect();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(%request_id, "Returned {} results in {} ms", hits.len(), elapsed_ms);

    (
        StatusCode::OK,
        Json(ApiResponse::success(SearchResponse {
            query: req.query,
            results: hits,
            elapsed_ms,
        })),
    )
}

/// Map an engine error to a status code and a message safe for clients
pub fn error_status(err: &VerseRagError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response<T>(request_id: Uuid, err: &VerseRagError) -> ApiResult<T> {
    let status = error_status(err);
    if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
        error!(%request_id, "Error processing search: {}", err);
    } else {
        warn!(%request_id, "Rejected search: {}", err);
    }
    (status, Json(ApiResponse::error(err.public_message())))
}
