//! # Larder Infrastructure
//!
//! Concrete implementations of the ports defined in `larder-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `postgres` - PostgreSQL post, profile and recipe stores via SeaORM
//! - `auth` - JWT bearer token verification
//! - `rate-limit` - Per-client rate limiting via governor

pub mod cache;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-exports - In-Memory
pub use cache::{CachedRecipeCatalog, InMemoryCache};
pub use memory::{InMemoryPostRepository, InMemoryRecipeCatalog, InMemoryUserRepository};

#[cfg(feature = "postgres")]
pub use database::{PostgresPostRepository, PostgresRecipeCatalog, PostgresUserRepository};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};
