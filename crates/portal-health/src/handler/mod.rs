//! HTTP handler for the monitoring API
//!
//! Monitor CRUD, check-now, ad-hoc probes, metric summaries and a
//! Prometheus scrape endpoint.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::contracts::*;
use crate::error::MonitorError;
use crate::service::MonitoringService;

pub const SERVICE_NAME: &str = "portal-health";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state
pub struct AppState {
    pub service: Arc<MonitoringService>,
}

impl AppState {
    pub fn new(service: Arc<MonitoringService>) -> Self {
        Self { service }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/v1/probe", post(probe_target))
        .route("/api/v1/monitors", get(list_monitors).post(create_monitor))
        .route(
            "/api/v1/monitors/:id",
            get(get_monitor).delete(delete_monitor),
        )
        .route("/api/v1/monitors/:id/check", post(check_monitor))
        .route("/api/v1/monitors/:id/metrics", get(monitor_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(err: MonitorError) -> (StatusCode, Json<ApiError>) {
    let (status, kind) = match &err {
        MonitorError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
        MonitorError::InvalidInput(_) | MonitorError::Parse(_) => {
            (StatusCode::BAD_REQUEST, "InvalidInput")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }

    (
        status,
        Json(ApiError {
            error: kind.to_string(),
            message: err.to_string(),
        }),
    )
}

/// Liveness endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}

async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let body = state.service.metrics().render().map_err(api_error)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

/// Probe an unregistered target (no history, no notifications)
async fn probe_target(
    State(state): State<Arc<AppState>>,
    Json(target): Json<ProbeTarget>,
) -> Json<ProbeResult> {
    Json(state.service.probe(&target).await)
}

async fn list_monitors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<MonitorView>> {
    let monitors = state
        .service
        .registry()
        .list(query.client_id.as_deref())
        .await;
    Json(monitors.iter().map(MonitorView::from).collect())
}

async fn create_monitor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewMonitor>,
) -> ApiResult<(StatusCode, Json<MonitorView>)> {
    let monitor = state.service.register(request).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(MonitorView::from(&monitor))))
}

async fn get_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MonitorView>> {
    let monitor = state.service.registry().get(id).await.map_err(api_error)?;
    Ok(Json(MonitorView::from(&monitor)))
}

async fn delete_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.remove(id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check now: probe, record and notify
async fn check_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CheckOutcome>> {
    let outcome = state.service.check_now(id).await.map_err(api_error)?;
    Ok(Json(outcome))
}

async fn monitor_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<MetricsSummary>> {
    let range = match query.range.as_deref() {
        Some(raw) => raw
            .parse::<TimeRange>()
            .map_err(|e| api_error(MonitorError::InvalidInput(e)))?,
        None => TimeRange::default(),
    };

    let summary = state.service.summary(id, range).await.map_err(api_error)?;
    Ok(Json(summary))
}

/// Liveness response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub range: Option<String>,
}

/// API error
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    fn router() -> (Router, Arc<MonitoringService>) {
        let service = Arc::new(MonitoringService::new(&ServiceConfig::default()).unwrap());
        let router = create_router(Arc::new(AppState::new(service.clone())));
        (router, service)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json<T: DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _) = router();
        let (status, body) = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = json(&body);
        assert_eq!(health.service, SERVICE_NAME);
    }

    #[tokio::test]
    async fn test_create_and_fetch_monitor() {
        let (router, _) = router();
        let (status, body) = send(
            &router,
            post_json(
                "/api/v1/monitors",
                serde_json::json!({
                    "client_id": "acme",
                    "service_family": "hibob",
                    "credentials": {"apiToken": "secret"}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!String::from_utf8_lossy(&body).contains("secret\""));
        let created: MonitorView = json(&body);
        assert_eq!(created.current_status, HealthStatus::Unknown);

        let (status, body) = send(
            &router,
            Request::get(format!("/api/v1/monitors/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let fetched: MonitorView = json(&body);
        assert_eq!(fetched.id, created.id);

        let (_, body) = send(
            &router,
            Request::get("/api/v1/monitors?client_id=globex")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let listed: Vec<MonitorView> = json(&body);
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_client_id_rejected() {
        let (router, _) = router();
        let (status, body) = send(
            &router,
            post_json(
                "/api/v1/monitors",
                serde_json::json!({"client_id": " ", "service_family": "keypay"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ApiError = json(&body);
        assert_eq!(err.error, "InvalidInput");
    }

    #[tokio::test]
    async fn test_unknown_monitor_is_404() {
        let (router, _) = router();
        let (status, _) = send(
            &router,
            Request::post(format!("/api/v1/monitors/{}/check", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_check_without_credentials_then_metrics() {
        let (router, service) = router();
        let monitor = service
            .register(NewMonitor::new(
                "acme",
                ProbeTarget::new(ServiceFamily::Workato, Credentials::new()),
            ))
            .await
            .unwrap();

        let (status, body) = send(
            &router,
            Request::post(format!("/api/v1/monitors/{}/check", monitor.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let outcome: CheckOutcome = json(&body);
        assert_eq!(outcome.result.status, HealthStatus::Unknown);
        assert!(outcome.monitor.last_checked_at.is_some());

        let (status, body) = send(
            &router,
            Request::get(format!("/api/v1/monitors/{}/metrics?range=1h", monitor.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let summary: MetricsSummary = json(&body);
        assert_eq!(summary.range, TimeRange::OneHour);
        assert_eq!(summary.total_checks, 1);
        assert_eq!(summary.uptime_percentage, Some(0.0));
        assert!(summary.average_response_time_ms.is_none());

        let (status, _) = send(
            &router,
            Request::get(format!("/api/v1/monitors/{}/metrics?range=2w", monitor.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_then_prometheus() {
        let (router, service) = router();
        let monitor = service
            .register(NewMonitor::new(
                "acme",
                ProbeTarget::new(ServiceFamily::Keypay, Credentials::new()),
            ))
            .await
            .unwrap();

        let (status, _) = send(
            &router,
            Request::delete(format!("/api/v1/monitors/{}", monitor.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&router, Request::get("/metrics").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&body).contains("portal_health_monitors 0"));
    }

    #[tokio::test]
    async fn test_adhoc_probe_counts_metrics() {
        let (router, service) = router();
        let (status, body) = send(
            &router,
            post_json("/api/v1/probe", serde_json::json!({"service_family": "hibob"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let result: ProbeResult = json(&body);
        assert_eq!(result.status, HealthStatus::Unknown);
        assert_eq!(service.metrics().probes_total(ServiceFamily::Hibob, "unknown"), 1);
    }
}
