//! Transport-level middleware: per-IP rate limiting and security headers.
//!
//! This is plumbing in front of the validators. The per-player submission
//! pacing lives in the score pipeline; the limiter here only bounds raw
//! request volume per client IP.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Transport middleware configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Requests per minute per client IP.
    pub rate_limit_per_minute: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 60,
        }
    }
}

/// Fixed-window request counter per client IP.
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of IP -> (request count, window start).
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

    /// Checks whether a request is allowed and updates the counter.
    /// Returns (allowed, remaining, reset_after_secs).
    pub fn check_request(&self, ip: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(ip.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *count = 0;
            *window_start = now;
        }

        let remaining = self.limit.saturating_sub(*count);
        let reset_after = self
            .window
            .checked_sub(now.duration_since(*window_start))
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if *count >= self.limit {
            return (false, 0, reset_after);
        }

        *count += 1;
        (true, remaining.saturating_sub(1), reset_after)
    }

    /// Drops entries whose window has long passed.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.requests
            .retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }
}

/// Shared middleware state.
#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self {
            config,
            rate_limiter,
        }
    }
}

/// Extracts the client IP, honoring reverse-proxy headers.
fn get_client_ip(headers: &HeaderMap, addr: Option<&SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str() {
            return ip.trim().to_string();
        }
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Per-IP rate limiting middleware.
pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_ip = get_client_ip(&headers, Some(&addr));
    let (allowed, remaining, reset_after) = state.rate_limiter.check_request(&client_ip);

    if !allowed {
        warn!(
            client_ip = %client_ip,
            path = %request.uri().path(),
            "request rate limit exceeded"
        );

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert(
            "X-RateLimit-Limit",
            HeaderValue::from(state.config.rate_limit_per_minute),
        );
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("Retry-After", HeaderValue::from(reset_after));
        return Err(response);
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from(state.config.rate_limit_per_minute),
    );
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));

    Ok(response)
}

/// Standard security headers on every response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
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
    fn test_rate_limiter_allows_up_to_limit() {
        let limiter = RateLimiter::new(3);

        for expected_remaining in [2, 1, 0] {
            let (allowed, remaining, _) = limiter.check_request("10.0.0.1");
            assert!(allowed);
            assert_eq!(remaining, expected_remaining);
        }

        let (allowed, remaining, _) = limiter.check_request("10.0.0.1");
        assert!(!allowed);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_rate_limiter_isolates_ips() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check_request("10.0.0.1").0);
        assert!(!limiter.check_request("10.0.0.1").0);
        assert!(limiter.check_request("10.0.0.2").0);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(get_client_ip(&headers, Some(&addr)), "203.0.113.7");

        let empty = HeaderMap::new();
        assert_eq!(get_client_ip(&empty, Some(&addr)), "127.0.0.1");
    }
}
