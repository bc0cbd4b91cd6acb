//! SeaORM entities.

pub mod post;
pub mod post_comment;
pub mod post_like;
pub mod recipe;
pub mod user;
