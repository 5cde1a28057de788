use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorError,
    GovernorLayer,
};

/// IP-keyed governor layer
pub type IpGovernorLayer = GovernorLayer<
    PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Turn governor rejections into the API's JSON error shape
pub fn rate_limit_error_handler(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let body = json!({
                "success": false,
                "message": format!("Too many requests. Try again in {} seconds.", wait_time.max(1)),
            });
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(wait_time.max(1)));
            response
        }
        GovernorError::UnableToExtractKey => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "message": "No authentication found",
            })),
        )
            .into_response(),
        GovernorError::Other { code, msg, .. } => {
            tracing::error!(status = %code, ?msg, "Rate limiter failure");
            (
                code,
                Json(json!({
                    "success": false,
                    "message": msg.unwrap_or_else(|| "Internal server error".to_string()),
                })),
            )
                .into_response()
        }
    }
}

fn ip_governor(per_ms: u64, burst: u32) -> IpGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("governor period and burst must be non-zero"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Global limiter per client IP, applied before authentication
/// - 1000 requests per minute (one token every 60ms)
pub fn create_global_governor() -> IpGovernorLayer {
    ip_governor(60, 1000)
}

/// Stricter per-IP limiter for the public auth routes (login, register)
/// - 20 requests per minute, burst of 10
pub fn create_public_governor() -> IpGovernorLayer {
    ip_governor(3000, 10)
}

/// Middleware to log request details and rejections
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    tracing::debug!(client_ip = %addr.ip(), %method, %uri, "Incoming request");

    let response = next.run(request).await;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(client_ip = %addr.ip(), %method, %uri, "Rate limited");
    } else if status.is_client_error() || status.is_server_error() {
        tracing::warn!(client_ip = %addr.ip(), %method, %uri, %status, "Request failed");
    } else {
        tracing::debug!(client_ip = %addr.ip(), %method, %uri, %status, "Request completed");
    }

    response
}
