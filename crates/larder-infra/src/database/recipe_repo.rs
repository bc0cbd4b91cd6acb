//! PostgreSQL recipe lookups.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DbConn, EntityTrait};
use uuid::Uuid;

use larder_core::domain::RecipeSnapshot;
use larder_core::error::RepoError;
use larder_core::ports::RecipeCatalog;

use super::entity::recipe;

pub struct PostgresRecipeCatalog {
    db: Arc<DbConn>,
}

impl PostgresRecipeCatalog {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeCatalog for PostgresRecipeCatalog {
    async fn find_snapshot(&self, recipe_id: Uuid) -> Result<Option<RecipeSnapshot>, RepoError> {
        let result = recipe::Entity::find_by_id(recipe_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.as_ref().map(recipe::Model::snapshot))
    }
}
