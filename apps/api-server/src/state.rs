//! Application state - shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use larder_core::ports::{
    Cache, PostRepository, RateLimiter, RecipeCatalog, TokenService, UserRepository,
};
use larder_core::service::FeedConfig;
use larder_core::{FeedService, PostService};
use larder_infra::{
    CachedRecipeCatalog, InMemoryCache, InMemoryPostRepository, InMemoryRecipeCatalog,
    InMemoryUserRepository, JwtTokenService,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub feed: Arc<FeedService>,
    pub tokens: Arc<dyn TokenService>,
    /// `None` disables rate limiting.
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
}

/// The storage ports the services are built on.
struct Stores {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    recipes: Arc<dyn RecipeCatalog>,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            posts: Arc::new(InMemoryPostRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            recipes: Arc::new(InMemoryRecipeCatalog::new()),
        }
    }

    #[cfg(feature = "postgres")]
    async fn from_config(config: &AppConfig) -> Self {
        use larder_infra::database::connect;
        use larder_infra::{PostgresPostRepository, PostgresRecipeCatalog, PostgresUserRepository};

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running on the in-memory store.");
            return Self::in_memory();
        };

        match connect(db_config).await {
            Ok(conn) => {
                let conn = Arc::new(conn);
                Self {
                    posts: Arc::new(PostgresPostRepository::new(conn.clone())),
                    users: Arc::new(PostgresUserRepository::new(conn.clone())),
                    recipes: Arc::new(PostgresRecipeCatalog::new(conn)),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
                Self::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn from_config(_config: &AppConfig) -> Self {
        tracing::info!("Running without postgres feature - using in-memory store");
        Self::in_memory()
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let stores = Stores::from_config(config).await;

        let cache = Arc::new(InMemoryCache::new());
        spawn_cache_sweeper(cache.clone(), config.recipe_cache_ttl);
        let recipes: Arc<dyn RecipeCatalog> = Arc::new(CachedRecipeCatalog::new(
            stores.recipes.clone(),
            cache as Arc<dyn Cache>,
            config.recipe_cache_ttl,
        ));
        let tokens = Arc::new(JwtTokenService::new(config.jwt.clone()));

        let state = Self::assemble(
            Stores { recipes, ..stores },
            tokens,
            config.feed,
            rate_limiter(config),
        );
        tracing::info!(
            rate_limited = state.rate_limiter.is_some(),
            "Application state initialized"
        );
        state
    }

    /// State over fresh in-memory stores.
    pub fn in_memory(tokens: Arc<dyn TokenService>, feed: FeedConfig) -> Self {
        Self::assemble(Stores::in_memory(), tokens, feed, None)
    }

    fn assemble(
        stores: Stores,
        tokens: Arc<dyn TokenService>,
        feed: FeedConfig,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Self {
        Self {
            posts: Arc::new(PostService::new(
                stores.posts.clone(),
                stores.users,
                stores.recipes,
            )),
            feed: Arc::new(FeedService::new(stores.posts, feed)),
            tokens,
            rate_limiter,
        }
    }
}

/// Drop expired recipe snapshots once per TTL. Reads only evict the key they
/// touch.
fn spawn_cache_sweeper(cache: Arc<InMemoryCache>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Expired cache entries removed");
            }
        }
    });
}

#[cfg(feature = "rate-limit")]
fn rate_limiter(config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    use larder_infra::InMemoryRateLimiter;

    match InMemoryRateLimiter::new(config.rate_limit.clone()) {
        Ok(limiter) => Some(Arc::new(limiter)),
        Err(e) => {
            tracing::error!(error = %e, "Invalid rate limit configuration. Rate limiting disabled.");
            None
        }
    }
}

#[cfg(not(feature = "rate-limit"))]
fn rate_limiter(_config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    None
}
