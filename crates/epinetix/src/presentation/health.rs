//! Health check HTTP handlers.
//!
//! - `GET /health` — combined health status (JSON)
//! - `GET /health/ready` — readiness probe
//! - `GET /health/live` — liveness probe

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

#[derive(Clone)]
pub struct HealthState {
    pub tenant_registry: std::sync::Arc<epinetix_tenant::TenantRegistry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthResponse {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// GET /health — combined health status.
///
/// The tenant registry lives entirely in-process, so its presence is the
/// only thing to check here; there is no single shared SQL pool to ping
/// (each tenant owns its own connection, opened lazily on first use).
#[instrument(name = "handler.health.status", skip(_state))]
pub async fn health(State(_state): State<HealthState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
    };
    (StatusCode::OK, Json(response))
}

#[instrument(name = "handler.health.ready", skip(_state))]
pub async fn ready(State(_state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, "ready")
}

#[instrument(name = "handler.health.live")]
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

/// Routes for the combined app router, extracting `HealthState` via `FromRef`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use epinetix_tenant::TenantRegistry;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let state = HealthState {
            tenant_registry: Arc::new(TenantRegistry::new(false)),
        };
        Router::new()
            .route("/health", get(health))
            .route("/health/ready", get(ready))
            .route("/health/live", get(live))
            .with_state(state)
    }

    #[tokio::test]
    async fn health_returns_healthy_status() {
        let app = router();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn live_returns_ok() {
        let app = router();
        let response = app
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
