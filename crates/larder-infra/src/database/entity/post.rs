//! Post entity for SeaORM.

use sea_orm::entity::prelude::*;

/// Root row of the post aggregate. Likes and comments live in their own
/// tables and cascade on delete.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub author_id: Uuid,
    pub author_name: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub image_urls: Json,
    pub recipe_id: Option<Uuid>,
    pub recipe_title: Option<String>,
    pub recipe_image_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post_like::Entity")]
    Likes,
    #[sea_orm(has_many = "super::post_comment::Entity")]
    Comments,
}

impl Related<super::post_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::post_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
