use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipe fields copied onto a post when it references a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSnapshot {
    pub recipe_id: Uuid,
    pub title: String,
    /// First image of the recipe, if it has any.
    pub image_url: Option<String>,
}
