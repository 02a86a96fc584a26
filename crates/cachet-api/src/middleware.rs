//! Tower middleware for the Cachet API

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use cachet_core::RequestMeta;

use crate::auth::JwtAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Paths reachable without a bearer token. The verification endpoint is the
/// whole point of the system being public; the docs describe it.
fn is_public_path(path: &str) -> bool {
    path == "/health"
        || path == "/api/v1/verify"
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = JwtAuth::extract_from_header(auth_header)?;
    let claims = state.jwt_auth().decode(token)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Request ID middleware
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", value);
    }

    response
}

/// Request ID wrapper
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Caller metadata for the verification audit log. Proxy headers first; a
/// direct connection has no trustworthy address and records none.
pub fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    let ip_address = header_str("x-forwarded-for")
        .map(|chain| chain.split(',').next().unwrap_or("").trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| header_str("x-real-ip"));

    RequestMeta {
        ip_address,
        user_agent: header_str("user-agent"),
        referrer: header_str("referer"),
    }
}

/// CORS configuration from `CACHET_CORS_ORIGINS` (comma-separated), with a
/// restrictive localhost default when unset
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowOrigin, CorsLayer};

    let origins = std::env::var("CACHET_CORS_ORIGINS").ok();

    let allow_origin = match origins {
        Some(origins_str) if !origins_str.is_empty() => {
            let origins: Vec<axum::http::HeaderValue> = origins_str
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                tracing::warn!("CACHET_CORS_ORIGINS contains no valid origins, using localhost only");
                AllowOrigin::exact("https://localhost".parse().unwrap())
            } else {
                tracing::info!("CORS configured for {} origin(s)", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            tracing::warn!("CACHET_CORS_ORIGINS not set, using restrictive CORS (localhost only)");
            AllowOrigin::exact("https://localhost".parse().unwrap())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Timeout layer helper
pub fn timeout_layer(duration: std::time::Duration) -> tower_http::timeout::TimeoutLayer {
    tower_http::timeout::TimeoutLayer::new(duration)
}

/// Request body size limit (bounds upload size)
pub fn body_limit_layer(limit: usize) -> tower_http::limit::RequestBodyLimitLayer {
    tower_http::limit::RequestBodyLimitLayer::new(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(is_public_path("/health"));
        assert!(is_public_path("/api/v1/verify"));
        assert!(is_public_path("/docs"));
        assert!(!is_public_path("/api/v1/credentials"));
        assert!(!is_public_path("/api/v1/credentials/abc/revoke"));
    }

    #[test]
    fn test_request_meta_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        headers.insert("user-agent", "curl/8.0".parse().unwrap());

        let meta = request_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert!(meta.referrer.is_none());
    }

    #[test]
    fn test_request_meta_empty_headers() {
        let meta = request_meta(&HeaderMap::new());
        assert!(meta.ip_address.is_none());
        assert!(meta.user_agent.is_none());
    }
}
