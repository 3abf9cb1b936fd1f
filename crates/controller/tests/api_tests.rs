//! Integration tests for the remediator API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use controller_lib::{
    alert::AlertDispatcher,
    control_plane::{Operation, SimulatedControlPlane},
    controller::ControllerBuilder,
    health::Component,
    store::InMemoryClusterStore,
};
use search_remediator::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    control_plane: Arc<SimulatedControlPlane>,
}

async fn setup_test_app() -> TestApp {
    let app = setup_uninitialized_app();
    app.state.controller.initialize().await;
    app
}

fn setup_uninitialized_app() -> TestApp {
    let store = Arc::new(InMemoryClusterStore::new());
    let control_plane = Arc::new(SimulatedControlPlane::new());
    control_plane.register("search-a", 3);
    let alerts = Arc::new(AlertDispatcher::default());

    let (controller, _deferred_rx) =
        ControllerBuilder::new(store, control_plane.clone(), alerts.clone()).build();
    let state = Arc::new(AppState::new(controller, alerts));
    let router = create_router(state.clone());

    TestApp {
        router,
        state,
        control_plane,
    }
}

fn alarm(cluster: &str, name: &str) -> Value {
    json!({
        "clusterName": cluster,
        "timestamp": "2024-05-01T12:00:00Z",
        "alarmName": name,
        "state": "ALARM",
        "comparisonOperator": "GreaterThanThreshold",
        "threshold": 80.0,
        "value": 95.0,
        "reason": "Threshold crossed"
    })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let app = setup_test_app().await;

    let (status, health) = send(&app.router, "GET", "/healthz", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let app = setup_test_app().await;
    app.state
        .health_registry
        .set_degraded(Component::ControlPlane, "status calls timing out")
        .await;

    let (status, health) = send(&app.router, "GET", "/healthz", None).await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let app = setup_test_app().await;
    app.state
        .health_registry
        .set_unhealthy(Component::ClusterStore, "store unreachable")
        .await;

    let (status, health) = send(&app.router, "GET", "/healthz", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");

    let (status, readiness) = send(&app.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["reason"], "cluster_store unhealthy: store unreachable");
}

#[tokio::test]
async fn test_readyz_stays_ready_when_control_plane_fails() {
    let app = setup_test_app().await;
    app.state
        .health_registry
        .set_unhealthy(Component::ControlPlane, "endpoint gone")
        .await;

    let (status, readiness) = send(&app.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_before_and_after_initialization() {
    let app = setup_uninitialized_app();

    let (status, readiness) = send(&app.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    app.state.controller.initialize().await;
    let (status, readiness) = send(&app.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_alarm_scales_cluster() {
    let app = setup_test_app().await;

    let (status, report) = send(
        &app.router,
        "POST",
        "/api/v1/alarms",
        Some(alarm("search-a", "cpu-high")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cluster"], "search-a");
    assert_eq!(report["severity"], "HIGH");
    assert_eq!(report["strategy"], "alarm-rules");
    assert_eq!(report["actions"][0]["action"]["type"], "SCALE_OUT");
    assert_eq!(report["actions"][0]["disposition"], "EXECUTE");
    assert_eq!(report["actions"][0]["status"], "SUCCEEDED");

    let (status, record) = send(&app.router, "GET", "/api/v1/clusters/default/search-a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["spec"]["nodeCount"], 4);
    assert_eq!(record["status"]["phase"], "Ready");
    assert_eq!(app.control_plane.node_count("search-a"), Some(4));
}

#[tokio::test]
async fn test_repeated_alarm_is_deferred() {
    let app = setup_test_app().await;
    send(&app.router, "POST", "/api/v1/alarms", Some(alarm("search-a", "cpu-high"))).await;

    let (status, report) = send(
        &app.router,
        "POST",
        "/api/v1/alarms",
        Some(alarm("search-a", "cpu-high")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["actions"][0]["disposition"], "DEFER");
    assert_eq!(report["actions"][0]["status"], "DEFERRED");
    assert!(report["actions"][0]["remainingMs"].as_u64().unwrap() > 0);

    let (_, cooldowns) = send(&app.router, "GET", "/api/v1/cooldowns", None).await;
    assert_eq!(cooldowns["cooldowns"].as_array().unwrap().len(), 1);
    assert_eq!(cooldowns["pending"].as_array().unwrap().len(), 1);
    assert_eq!(cooldowns["cooldowns"][0]["rule"], "cpu-alarm-scale-out");
    assert_eq!(cooldowns["cooldowns"][0]["active"], true);
}

#[tokio::test]
async fn test_invalid_alarm_returns_400() {
    let app = setup_test_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/alarms",
        Some(alarm("  ", "cpu-high")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("clusterName"));
}

#[tokio::test]
async fn test_unknown_cluster_returns_404() {
    let app = setup_test_app().await;

    let (status, _) = send(&app.router, "GET", "/api/v1/clusters/default/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, "DELETE", "/api/v1/clusters/default/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provision_list_and_delete() {
    let app = setup_test_app().await;
    let request = json!({ "clusterName": "logs", "nodeCount": 2, "namespace": "search" });

    let (status, record) = send(&app.router, "POST", "/api/v1/clusters", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status"]["phase"], "Creating");
    assert_eq!(record["metadata"]["namespace"], "search");

    let (status, _) = send(&app.router, "POST", "/api/v1/clusters", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, clusters) = send(&app.router, "GET", "/api/v1/clusters?namespace=search", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clusters.as_array().unwrap().len(), 1);

    let (status, _) = send(&app.router, "DELETE", "/api/v1/clusters/search/logs", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, clusters) = send(&app.router, "GET", "/api/v1/clusters", None).await;
    assert!(clusters.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_provision_request_returns_400() {
    let app = setup_test_app().await;

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/clusters",
        Some(json!({ "clusterName": "logs", "nodeCount": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_cooldowns() {
    let app = setup_test_app().await;
    send(&app.router, "POST", "/api/v1/alarms", Some(alarm("search-a", "cpu-high"))).await;

    let (status, cleared) = send(
        &app.router,
        "DELETE",
        "/api/v1/cooldowns/search-a/cpu-alarm-scale-out",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["cleared"], 1);

    let (_, cleared) = send(&app.router, "DELETE", "/api/v1/cooldowns/search-a", None).await;
    assert_eq!(cleared["cleared"], 0);

    let (_, report) = send(
        &app.router,
        "POST",
        "/api/v1/alarms",
        Some(alarm("search-a", "cpu-high")),
    )
    .await;
    assert_eq!(report["actions"][0]["status"], "SUCCEEDED");
}

#[tokio::test]
async fn test_alerts_rendered_for_alertmanager() {
    let app = setup_test_app().await;
    send(&app.router, "POST", "/api/v1/alarms", Some(alarm("search-a", "disk-full"))).await;

    let (status, payload) = send(&app.router, "GET", "/api/v1/alerts", None).await;

    assert_eq!(status, StatusCode::OK);
    let alerts = payload["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["status"], "firing");
    assert_eq!(alerts[0]["labels"]["alertname"], "SearchClusterRemediation");
    assert_eq!(alerts[0]["labels"]["severity"], "critical");
    assert_eq!(alerts[0]["labels"]["cluster"], "search-a");
}

#[tokio::test]
async fn test_control_plane_failure_is_reported_per_action() {
    let app = setup_test_app().await;
    app.control_plane.fail(Operation::Scale);

    let (status, report) = send(
        &app.router,
        "POST",
        "/api/v1/alarms",
        Some(alarm("search-a", "cpu-high")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["actions"][0]["status"], "FAILED");
    assert_eq!(report["actions"][0]["action"]["success"], false);

    let (_, health) = send(&app.router, "GET", "/healthz", None).await;
    assert_eq!(health["components"]["control_plane"]["status"], "degraded");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_test_app().await;
    send(&app.router, "POST", "/api/v1/alarms", Some(alarm("search-a", "cpu-high"))).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("search_remediator_alarms_received_total"));
    assert!(text.contains("search_remediator_reconcile_latency_seconds"));
}
