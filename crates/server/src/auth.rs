//! Authentication middleware
//!
//! Bearer-token auth for the operator API. Health, metrics, and webhook
//! paths are public by default; everything else requires the configured
//! key once auth is enabled.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Warn about disabled auth only once
static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let auth = &state.settings.server.auth;

    if !auth.enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "API authentication is DISABLED; set CALLFLOW__SERVER__AUTH__ENABLED=true for production"
            );
        }
        return next.run(request).await;
    }

    let path = request.uri().path();
    if auth.public_paths.iter().any(|p| path.starts_with(p)) {
        return next.run(request).await;
    }

    let Some(expected) = auth.api_key.as_deref().filter(|k| !k.is_empty()) else {
        tracing::error!("auth is enabled but no API key is configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server authentication not configured",
        )
            .into_response();
    };

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match header_value {
        Some(value) if value.starts_with("Bearer ") => {
            let provided = &value[7..];
            if constant_time_compare(provided.as_bytes(), expected.as_bytes()) {
                next.run(request).await
            } else {
                tracing::warn!("invalid API key presented");
                (StatusCode::UNAUTHORIZED, "Invalid API key").into_response()
            }
        }
        Some(_) => (
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format. Expected: Bearer <token>",
        )
            .into_response(),
        None => (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response(),
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"secret", b"secret"));
        assert!(!constant_time_compare(b"secret", b"secre"));
        assert!(!constant_time_compare(b"secret", b"secreT"));
        assert!(!constant_time_compare(b"abc", b"xyz"));
    }
}
