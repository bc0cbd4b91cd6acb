//! Rate limiting port.

use async_trait::async_trait;
use std::time::Duration;

/// Rate limiter keyed by client (user id or remote address).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key` and report whether it may proceed.
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;
}

#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// How long until the key may send again; zero when allowed.
    pub retry_after: Duration,
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}
