use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use larder_core::domain::RecipeSnapshot;
use larder_core::error::RepoError;
use larder_core::ports::RecipeCatalog;

/// Recipe snapshots held in memory.
#[derive(Default)]
pub struct InMemoryRecipeCatalog {
    recipes: RwLock<HashMap<Uuid, RecipeSnapshot>>,
}

impl InMemoryRecipeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, snapshot: RecipeSnapshot) {
        self.recipes
            .write()
            .await
            .insert(snapshot.recipe_id, snapshot);
    }
}

#[async_trait]
impl RecipeCatalog for InMemoryRecipeCatalog {
    async fn find_snapshot(&self, recipe_id: Uuid) -> Result<Option<RecipeSnapshot>, RepoError> {
        Ok(self.recipes.read().await.get(&recipe_id).cloned())
    }
}
