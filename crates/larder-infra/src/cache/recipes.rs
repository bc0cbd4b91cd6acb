//! Recipe catalog decorator that caches snapshots.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use larder_core::domain::RecipeSnapshot;
use larder_core::error::RepoError;
use larder_core::ports::{Cache, RecipeCatalog};

/// Serves recipe snapshots from the cache, falling through to the wrapped
/// catalog on a miss. Only hits are cached; a missing recipe is looked up
/// again next time.
pub struct CachedRecipeCatalog {
    inner: Arc<dyn RecipeCatalog>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CachedRecipeCatalog {
    pub fn new(inner: Arc<dyn RecipeCatalog>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn key(recipe_id: Uuid) -> String {
        format!("recipe:snapshot:{recipe_id}")
    }
}

#[async_trait]
impl RecipeCatalog for CachedRecipeCatalog {
    async fn find_snapshot(&self, recipe_id: Uuid) -> Result<Option<RecipeSnapshot>, RepoError> {
        let key = Self::key(recipe_id);

        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str::<RecipeSnapshot>(&raw) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry"),
            }
        }

        let snapshot = self.inner.find_snapshot(recipe_id).await?;

        if let Some(snapshot) = &snapshot {
            match serde_json::to_string(snapshot) {
                Ok(raw) => {
                    if let Err(e) = self.cache.set(&key, &raw, Some(self.ttl)).await {
                        tracing::warn!(key = %key, error = %e, "Failed to cache recipe snapshot");
                    }
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode recipe snapshot"),
            }
        }

        Ok(snapshot)
    }
}
