use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::{LimitedEndpoint, RateDecision};
use crate::storage::AccountStorage;
use crate::AppState;

/// Identify the client a request is counted against.
///
/// Uses the peer address, or `X-Real-IP` when the server sits behind a proxy
/// that sets it. Falls back to `"unknown"`, which puts such clients in one bucket.
pub fn client_key(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = request
            .headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return ip.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)
}

/// Rate limiter middleware for credential submissions
pub async fn rate_limit<S: AccountStorage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }
    let Some(endpoint) = LimitedEndpoint::from_path(request.uri().path()) else {
        return next.run(request).await;
    };

    let client = client_key(&request, state.settings.rate_limit.trust_proxy_headers);
    match state.rate_limiter.check(&client, endpoint) {
        RateDecision::Allowed { remaining } => {
            debug!(client = %client, endpoint = endpoint.as_str(), remaining, "rate limit check passed");
            next.run(request).await
        },
        RateDecision::Denied { retry_after } => {
            let retry_after = retry_after_secs(retry_after);
            warn!(
                client = %client,
                endpoint = endpoint.as_str(),
                retry_after_secs = retry_after,
                "rate limit exceeded"
            );
            let body = json!({
                "error": {
                    "code": "RATE_001",
                    "message": state.rate_limiter.denial_message(endpoint),
                }
            });
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(body),
            )
                .into_response()
        },
    }
}
