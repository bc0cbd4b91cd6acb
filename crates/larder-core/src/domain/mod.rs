//! Domain entities - the core business objects.

mod post;
mod recipe;
mod user;

pub use post::{Comment, Like, LikeTally, NewPost, Post, PostDetail, PostSummary};
pub use recipe::RecipeSnapshot;
pub use user::User;
