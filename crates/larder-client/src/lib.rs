//! # Larder Client
//!
//! Typed access to the Larder posts API plus the optimistic local state a
//! UI keeps on top of it: changes are applied immediately, reconciled with
//! the server result, and rolled back and refetched on failure.

pub mod api;
pub mod detail;
pub mod feed;
pub mod http;
pub mod optimistic;
pub mod session;

#[cfg(test)]
mod testing;

pub use api::{ClientError, PostsApi};
pub use detail::PostController;
pub use feed::FeedController;
pub use http::HttpPostsApi;
pub use optimistic::{Entity, MutationKey, OptimisticStore, Pending, Settled};
pub use session::{Session, Viewer};
