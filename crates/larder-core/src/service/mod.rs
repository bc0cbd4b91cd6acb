//! Application services over the ports.

mod feed;
mod posts;

pub use feed::{FeedConfig, FeedPage, FeedRequest, FeedService, Pagination};
pub use posts::PostService;
