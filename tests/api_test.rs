use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use multibrain::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct SilentIntent;

#[async_trait::async_trait]
impl IntentAnalyzer for SilentIntent {
    async fn analyze_intent(&self, _request_text: &str) -> anyhow::Result<IntentResult> {
        std::future::pending().await
    }
}

fn service() -> Arc<AnalysisService> {
    Arc::new(AnalysisService::new(ServiceConfig::default()).unwrap())
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = create_router(service())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_run_analysis_and_read_messages() {
    let service = service();

    let response = create_router(service.clone())
        .oneshot(
            Request::post("/analyses")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"request": "restart nginx", "correlation_id": "api-1"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let analysis = json_body(response).await;
    assert_eq!(analysis["request"]["correlation_id"], "api-1");
    assert_eq!(analysis["execution_strategy"], "manual_review");

    let response = create_router(service.clone())
        .oneshot(Request::get("/runs/api-1/messages").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let messages = json_body(response).await;
    assert_eq!(messages.as_array().unwrap().len(), 2);

    let response = create_router(service)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let metrics = json_body(response).await;
    assert_eq!(metrics["runs_succeeded"], 1);
}

#[tokio::test]
async fn test_empty_request_rejected() {
    let response = create_router(service())
        .oneshot(
            Request::post("/analyses")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"request": "  "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_run_returns_partial() {
    let coordinator = Arc::new(MultibrainCoordinator::new(CoordinatorConfig::default()));
    let service = Arc::new(AnalysisService::from_parts(
        coordinator,
        Arc::new(MemoryAuditSink::default()),
        ServiceConfig::default(),
    ));

    let response = create_router(service)
        .oneshot(
            Request::post("/analyses")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"request": "server is down"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("intent_analyzer"));
    assert_eq!(body["partial"]["metadata"]["status"], "failed");
}

#[tokio::test]
async fn test_intent_stage_timeout_is_gateway_timeout() {
    let coordinator = MultibrainCoordinator::new(CoordinatorConfig {
        stage_timeout: Some(Duration::from_millis(50)),
        ..CoordinatorConfig::default()
    })
    .with_intent_analyzer(Arc::new(SilentIntent))
    .with_technical_planner(Arc::new(multibrain::brain::NoOpTechnicalPlanner));
    let service = Arc::new(AnalysisService::from_parts(
        Arc::new(coordinator),
        Arc::new(MemoryAuditSink::default()),
        ServiceConfig::default(),
    ));

    let response = create_router(service)
        .oneshot(
            Request::post("/analyses")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"request": "server is down"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_runs_and_cancel_unknown() {
    let service = service();

    let response = create_router(service.clone())
        .oneshot(Request::get("/runs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await.as_array().unwrap().is_empty());

    let response = create_router(service)
        .oneshot(Request::delete("/runs/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_metrics() {
    let service = service();
    service.coordinator().analyze("restart nginx").await.unwrap();

    let response = create_router(service.clone())
        .oneshot(Request::post("/metrics/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(service.coordinator().metrics(), MetricsSnapshot::default());
}
