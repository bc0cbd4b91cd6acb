//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod rate_limit;
mod recipe;
mod repository;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use recipe::RecipeCatalog;
pub use repository::{
    LikeWrite, PostPage, PostQuery, PostRepository, PostSort, SortDirection, SortField,
    UserRepository,
};
