//! API middleware.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics;

/// Request id header set and propagated by the router.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Keys beyond this trigger a sweep of idle limiter state.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Per-client rate limiter keyed by IP.
#[derive(Clone)]
pub struct RateLimiterCache {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl RateLimiterCache {
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_second(rps))),
        }
    }

    /// Check rate limit for an IP.
    pub fn check(&self, ip: IpAddr) -> bool {
        if self.limiter.len() > MAX_TRACKED_CLIENTS {
            self.limiter.retain_recent();
            self.limiter.shrink_to_fit();
        }
        self.limiter.check_key(&ip).is_ok()
    }
}

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::CONTENT_DISPOSITION,
        ])
        .max_age(Duration::from_secs(600));

    if origins.iter().any(|o| o == "*") {
        layer.allow_headers(Any).allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
            .allow_origin(origins)
    }
}

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}

fn is_probe_path(path: &str) -> bool {
    matches!(path, "/health" | "/healthz" | "/ready" | "/metrics")
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    if !is_probe_path(uri.path()) {
        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            "Request completed"
        );
    }

    response
}

/// Rate limiting middleware; requests with no identifiable client pass through.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiterCache>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if let Some(ip) = extract_client_ip(&request) {
        if !rate_limiter.check(ip) {
            warn!(ip = %ip, "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            return ([(header::RETRY_AFTER, "1")], ApiError::RateLimited).into_response();
        }
    }

    next.run(request).await
}

/// Extract client IP from proxy headers or connection info.
fn extract_client_ip(request: &Request<Body>) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse().ok())
    };

    header_ip("x-forwarded-for")
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<std::net::SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(name: &str, value: &str) -> Request<Body> {
        Request::builder()
            .uri("/download")
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let request = request_with("x-forwarded-for", "203.0.113.7, 10.0.0.1");
        assert_eq!(
            extract_client_ip(&request),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn test_real_ip_fallback() {
        let request = request_with("x-real-ip", "198.51.100.2");
        assert_eq!(
            extract_client_ip(&request),
            Some("198.51.100.2".parse().unwrap())
        );
    }

    #[test]
    fn test_no_client_ip() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request), None);
    }

    #[test]
    fn test_rate_limiter_per_ip() {
        let cache = RateLimiterCache::new(1);
        let a: IpAddr = "203.0.113.7".parse().unwrap();
        let b: IpAddr = "203.0.113.8".parse().unwrap();
        assert!(cache.check(a));
        assert!(!cache.check(a));
        assert!(cache.check(b));
    }

    #[test]
    fn test_health_paths_not_logged() {
        assert!(is_probe_path("/healthz"));
        assert!(!is_probe_path("/download"));
    }
}
