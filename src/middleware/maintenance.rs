use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;

/// Paths that stay reachable while maintenance is on, so an admin can log in
/// and switch it back off.
const ALWAYS_ALLOWED: [&str; 4] = [
    "/api/health",
    "/api/auth",
    "/api/admin",
    "/api/maintenance-status",
];

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceStatus {
    pub enabled: bool,
    pub message: String,
}

/// Shared maintenance flag, owned by `AppState` and flipped by admins.
#[derive(Clone)]
pub struct MaintenanceSwitch {
    inner: Arc<RwLock<MaintenanceStatus>>,
}

impl MaintenanceSwitch {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MaintenanceStatus {
                enabled: false,
                message: message.into(),
            })),
        }
    }

    pub async fn status(&self) -> MaintenanceStatus {
        self.inner.read().await.clone()
    }

    /// Turn maintenance on or off. The message is only replaced when one is given.
    pub async fn set(&self, enabled: bool, message: Option<String>) -> MaintenanceStatus {
        let mut status = self.inner.write().await;
        status.enabled = enabled;
        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            status.message = message;
        }
        status.clone()
    }
}

fn is_always_allowed(path: &str) -> bool {
    ALWAYS_ALLOWED.iter().any(|prefix| path.starts_with(prefix))
}

/// Reject non-admin traffic with 503 while maintenance is enabled
pub async fn maintenance_guard(
    State(switch): State<MaintenanceSwitch>,
    request: Request,
    next: Next,
) -> Response {
    let status = switch.status().await;

    if status.enabled && !is_always_allowed(request.uri().path()) {
        tracing::debug!(uri = %request.uri(), "Blocked by maintenance mode");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "maintenance": true,
                "message": status.message,
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(switch: MaintenanceSwitch) -> Router {
        Router::new()
            .route("/api/health", get(|| async { "ok" }))
            .route("/api/admin/dashboard", get(|| async { "ok" }))
            .route("/api/customers/bookings", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(switch, maintenance_guard))
    }

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_everything_passes_when_disabled() {
        let switch = MaintenanceSwitch::new("down");
        assert_eq!(status_of(app(switch), "/api/customers/bookings").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_enabled_blocks_customer_routes_only() {
        let switch = MaintenanceSwitch::new("down");
        switch.set(true, None).await;

        assert_eq!(
            status_of(app(switch.clone()), "/api/customers/bookings").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(app(switch.clone()), "/api/health").await, StatusCode::OK);
        assert_eq!(status_of(app(switch), "/api/admin/dashboard").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_keeps_message_unless_replaced() {
        let switch = MaintenanceSwitch::new("Back soon");

        let status = switch.set(true, None).await;
        assert!(status.enabled);
        assert_eq!(status.message, "Back soon");

        let status = switch.set(false, Some("Upgrading database".to_string())).await;
        assert!(!status.enabled);
        assert_eq!(status.message, "Upgrading database");
    }
}
