//! Request guards applied to the whole router
//!
//! - Actor header required on state-changing requests
//! - Per-client rate limiting
//! - Body size limit
//! - Security headers

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::api::actor::ACTOR_HEADER;
use crate::config::SecurityConfig;

#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    pub enable_auth: bool,
    pub rate_limit_per_minute: u32,
    pub max_request_size: usize,
    /// Path prefixes reachable without an actor header
    pub public_paths: Vec<String>,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            enable_auth: true,
            rate_limit_per_minute: 120,
            max_request_size: 64 * 1024,
            public_paths: vec!["/health".to_string(), "/admin/".to_string()],
        }
    }
}

impl From<&SecurityConfig> for SecurityMiddlewareConfig {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            enable_auth: config.enable_auth,
            rate_limit_per_minute: config.rate_limit_per_minute,
            max_request_size: config.max_request_size,
            ..Self::default()
        }
    }
}

/// Fixed-window request counter per client
#[derive(Debug)]
pub struct RateLimiter {
    /// client -> (requests in window, window start)
    requests: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            limit: requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    /// Returns (allowed, remaining, reset_after_secs)
    pub fn check_request(&self, client: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(client.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *count = 0;
            *window_start = now;
        }

        let reset_after = self
            .window
            .checked_sub(now.duration_since(*window_start))
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if *count >= self.limit {
            return (false, 0, reset_after);
        }

        *count += 1;
        (true, self.limit - *count, reset_after)
    }

    /// Drop windows that expired a while ago
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.requests
            .retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self {
            config,
            rate_limiter,
        }
    }
}

/// Client key for rate limiting: forwarded address first, then the socket
fn client_key(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return ip.trim().to_string();
    }

    if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.trim().to_string();
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|p| path.starts_with(p))
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Reject state-changing requests that carry no actor.
///
/// Reads stay anonymous. The header value itself is parsed by the
/// `CurrentActor` extractor.
pub async fn auth_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path();

    if !state.config.enable_auth
        || is_read_only(request.method())
        || is_public_path(path, &state.config.public_paths)
    {
        return Ok(next.run(request).await);
    }

    if headers.contains_key(ACTOR_HEADER) {
        debug!(path = %path, "Actor header present");
        Ok(next.run(request).await)
    } else {
        warn!(method = %request.method(), path = %path, "Missing actor header");
        Err(StatusCode::UNAUTHORIZED)
    }
}

pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(&headers, addr);
    let (allowed, remaining, reset_after) = state.rate_limiter.check_request(&client);
    let limit = HeaderValue::from(state.config.rate_limit_per_minute);

    if !allowed {
        warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", limit);
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("Retry-After", HeaderValue::from(reset_after));
        return Err(response);
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", limit);
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));

    Ok(response)
}

pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let length = headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = length {
        if length > state.config.max_request_size {
            warn!(
                length = length,
                max = state.config.max_request_size,
                "Request body too large"
            );
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    Ok(next.run(request).await)
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Ratings change with every vote
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.remove("Server");

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::new(3);

        let (allowed, remaining, _) = limiter.check_request("10.0.0.1");
        assert!(allowed);
        assert_eq!(remaining, 2);
        assert!(limiter.check_request("10.0.0.1").0);
        assert!(limiter.check_request("10.0.0.1").0);

        let (allowed, remaining, _) = limiter.check_request("10.0.0.1");
        assert!(!allowed);
        assert_eq!(remaining, 0);

        assert!(limiter.check_request("10.0.0.2").0);
        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_client_key_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        let addr: SocketAddr = "192.0.2.1:4000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(addr)), "192.0.2.1");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_key(&headers, Some(addr)), "203.0.113.9");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_is_public_path() {
        let public = SecurityMiddlewareConfig::default().public_paths;
        assert!(is_public_path("/health", &public));
        assert!(is_public_path("/admin/users/recalculate", &public));
        assert!(!is_public_path("/publications/1/vote/like", &public));
    }
}
