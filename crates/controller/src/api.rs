//! HTTP API: alarm inbox, admin endpoints, health checks and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use controller_lib::{
    alert::{AlertDispatcher, AlertmanagerPayload},
    gate::CooldownEntry,
    health::{ComponentStatus, HealthRegistry},
    models::{AlarmEvent, ClusterRecord, ClusterRequest},
    scheduler::DeferredAction,
    Controller, ReconcileReport, RemediationError, StoreError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub alerts: Arc<AlertDispatcher>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(controller: Arc<Controller>, alerts: Arc<AlertDispatcher>) -> Self {
        let health_registry = controller.health().clone();
        Self {
            controller,
            alerts,
            health_registry,
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Remediation error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(RemediationError);

impl From<RemediationError> for ApiError {
    fn from(err: RemediationError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn not_found(what: String) -> Self {
        Self(RemediationError::Store(StoreError::NotFound(what)))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            RemediationError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            RemediationError::Store(StoreError::Conflict(_))
            | RemediationError::InvalidTransition { .. } => StatusCode::CONFLICT,
            RemediationError::Store(StoreError::Backend(_)) => StatusCode::SERVICE_UNAVAILABLE,
            RemediationError::ControlPlane(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, status = status.as_u16(), "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Inbound alarm event
async fn post_alarm(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AlarmEvent>,
) -> ApiResult<Json<ReconcileReport>> {
    let report = state.controller.reconcile(event).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct ClusterQuery {
    namespace: Option<String>,
}

async fn list_clusters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClusterQuery>,
) -> ApiResult<Json<Vec<ClusterRecord>>> {
    let records = state.controller.list(query.namespace.as_deref()).await?;
    Ok(Json(records))
}

async fn get_cluster(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<ClusterRecord>> {
    state
        .controller
        .get(&namespace, &name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("{}/{}", namespace, name)))
}

async fn create_cluster(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClusterRequest>,
) -> ApiResult<(StatusCode, Json<ClusterRecord>)> {
    info!(cluster = %request.cluster_name, nodes = request.node_count, "Provisioning requested");
    let record = state.controller.provision(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_cluster(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    if state.controller.delete(&namespace, &name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("{}/{}", namespace, name)))
    }
}

/// Recorded cooldowns plus the deferred actions waiting on them
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownsResponse {
    pub cooldowns: Vec<CooldownEntry>,
    pub pending: Vec<DeferredAction>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

async fn list_cooldowns(State(state): State<Arc<AppState>>) -> Json<CooldownsResponse> {
    Json(CooldownsResponse {
        cooldowns: state.controller.cooldowns(),
        pending: state.controller.pending_deferred(),
    })
}

async fn clear_cluster_cooldowns(
    State(state): State<Arc<AppState>>,
    Path(cluster): Path<String>,
) -> Json<ClearedResponse> {
    let cleared = state.controller.clear_all_cooldowns(&cluster);
    Json(ClearedResponse { cleared })
}

async fn clear_rule_cooldown(
    State(state): State<Arc<AppState>>,
    Path((cluster, rule)): Path<(String, String)>,
) -> Json<ClearedResponse> {
    let cleared = usize::from(state.controller.clear_cooldown(&cluster, &rule));
    Json(ClearedResponse { cleared })
}

async fn recent_alerts(State(state): State<Arc<AppState>>) -> Json<AlertmanagerPayload> {
    Json(state.alerts.to_alertmanager_payload().await)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/alarms", post(post_alarm))
        .route("/api/v1/clusters", get(list_clusters).post(create_cluster))
        .route(
            "/api/v1/clusters/:namespace/:name",
            get(get_cluster).delete(delete_cluster),
        )
        .route("/api/v1/cooldowns", get(list_cooldowns))
        .route("/api/v1/cooldowns/:cluster", delete(clear_cluster_cooldowns))
        .route("/api/v1/cooldowns/:cluster/:rule", delete(clear_rule_cooldown))
        .route("/api/v1/alerts", get(recent_alerts))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
