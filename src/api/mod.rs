//! HTTP API for the validation service.
//!
//! Provides REST endpoints for:
//! - Score and save validation
//! - Ban status and suspicious-activity reports
//! - Transport middleware (per-IP rate limiting, security headers)

pub mod middleware;
pub mod trust;
pub mod validation;

pub use middleware::{
    rate_limit_middleware, security_headers_middleware, RateLimiter, SecurityConfig, SecurityState,
};
pub use trust::{create_router as create_trust_router, TrustApiState};
pub use validation::{create_router as create_validation_router, ValidationApiState};
