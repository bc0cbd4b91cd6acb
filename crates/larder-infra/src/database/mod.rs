//! PostgreSQL stores built on SeaORM.

mod connection;
pub mod entity;
mod post_repo;
mod recipe_repo;
mod user_repo;

pub use connection::{DatabaseConfig, connect};
pub use post_repo::PostgresPostRepository;
pub use recipe_repo::PostgresRecipeCatalog;
pub use user_repo::PostgresUserRepository;
