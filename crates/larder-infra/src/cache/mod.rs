//! Cache implementations.

mod memory;
mod recipes;

pub use memory::InMemoryCache;
pub use recipes::CachedRecipeCatalog;
