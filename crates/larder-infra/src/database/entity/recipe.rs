//! Recipe entity for SeaORM. The feed only reads it.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    /// JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub image_urls: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Snapshot with the recipe's first image, if any.
    pub fn snapshot(&self) -> larder_core::domain::RecipeSnapshot {
        let image_url = self
            .image_urls
            .as_array()
            .and_then(|images| images.first())
            .and_then(|first| first.as_str())
            .map(str::to_string);

        larder_core::domain::RecipeSnapshot {
            recipe_id: self.id,
            title: self.title.clone(),
            image_url,
        }
    }
}
