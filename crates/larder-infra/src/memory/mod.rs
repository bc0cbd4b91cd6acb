//! In-memory stores - the fallback when no database is configured.

mod posts;
mod recipes;
mod users;

pub use posts::InMemoryPostRepository;
pub use recipes::InMemoryRecipeCatalog;
pub use users::InMemoryUserRepository;
