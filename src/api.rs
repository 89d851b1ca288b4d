use crate::service::AnalysisService;
use crate::types::AnalysisRequest;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn create_router(service: Arc<AnalysisService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyses", post(run_analysis))
        .route("/runs", get(list_runs))
        .route("/runs/:correlation_id", delete(cancel_run))
        .route("/runs/:correlation_id/messages", get(list_messages))
        .route("/metrics", get(get_metrics))
        .route("/metrics/reset", post(reset_metrics))
        .with_state(service)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct AnalysisBody {
    request: String,
    correlation_id: Option<String>,
}

async fn run_analysis(
    State(service): State<Arc<AnalysisService>>,
    Json(body): Json<AnalysisBody>,
) -> impl IntoResponse {
    if body.request.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "request must not be empty" })),
        )
            .into_response();
    }

    let request = match body.correlation_id {
        Some(id) => AnalysisRequest::with_correlation_id(body.request, id),
        None => AnalysisRequest::new(body.request),
    };

    match service.coordinator().run_analysis(request).await {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(failure) => {
            let status = if failure.error.is_timeout() {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (
                status,
                Json(serde_json::json!({
                    "error": failure.error.to_string(),
                    "partial": failure.partial,
                })),
            )
                .into_response()
        }
    }
}

async fn list_runs(State(service): State<Arc<AnalysisService>>) -> impl IntoResponse {
    Json(service.coordinator().active_runs())
}

async fn cancel_run(
    State(service): State<Arc<AnalysisService>>,
    Path(correlation_id): Path<String>,
) -> impl IntoResponse {
    if service.coordinator().cancel_run(&correlation_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn list_messages(
    State(service): State<Arc<AnalysisService>>,
    Path(correlation_id): Path<String>,
) -> impl IntoResponse {
    Json(service.audit().for_correlation(&correlation_id))
}

async fn get_metrics(State(service): State<Arc<AnalysisService>>) -> impl IntoResponse {
    Json(service.coordinator().metrics())
}

async fn reset_metrics(State(service): State<Arc<AnalysisService>>) -> impl IntoResponse {
    service.coordinator().reset_metrics();
    StatusCode::NO_CONTENT
}
