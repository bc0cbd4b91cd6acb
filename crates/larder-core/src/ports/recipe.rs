//! Recipe lookup port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::RecipeSnapshot;
use crate::error::RepoError;

/// Read-only view over the recipe collection, used to denormalize a recipe
/// onto a post at creation time.
#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    async fn find_snapshot(&self, recipe_id: Uuid) -> Result<Option<RecipeSnapshot>, RepoError>;
}
