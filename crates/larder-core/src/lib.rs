//! # Larder Core
//!
//! The domain layer of the Larder feed: the Post aggregate, the ports the
//! infrastructure implements, and the mutation and feed services built on
//! top of them. No infrastructure dependencies live here.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use error::{DomainError, RepoError};
pub use service::{FeedService, PostService};
