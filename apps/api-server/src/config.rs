//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use larder_core::service::FeedConfig;
use larder_infra::JwtConfig;

#[cfg(feature = "postgres")]
use larder_infra::database::DatabaseConfig;

#[cfg(feature = "rate-limit")]
use larder_infra::RateLimitConfig;

use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    #[cfg(feature = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub feed: FeedConfig,
    /// How long a resolved recipe snapshot is reused.
    pub recipe_cache_ttl: Duration,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = FeedConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            jwt: JwtConfig::from_env(),
            #[cfg(feature = "rate-limit")]
            rate_limit: RateLimitConfig::from_env(),
            feed: FeedConfig {
                default_limit: parse_var("FEED_DEFAULT_LIMIT").unwrap_or(defaults.default_limit),
                max_limit: parse_var("FEED_MAX_LIMIT").unwrap_or(defaults.max_limit),
            },
            recipe_cache_ttl: Duration::from_secs(
                parse_var("RECIPE_CACHE_TTL_SECS").unwrap_or(300),
            ),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}
