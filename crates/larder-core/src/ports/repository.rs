use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Like, Post, User};
use crate::error::{DomainError, RepoError};

/// Field a post listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Likes,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Ordering of a post listing. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl PostSort {
    pub fn newest_first() -> Self {
        Self::default()
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "likes" | "likesCount" => Ok(Self::Likes),
            "comments" | "commentsCount" => Ok(Self::Comments),
            other => Err(DomainError::Validation(format!(
                "unsupported sort field '{other}'"
            ))),
        }
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(DomainError::Validation(format!(
                "unsupported sort order '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreatedAt => "createdAt",
            Self::Likes => "likes",
            Self::Comments => "comments",
        };
        f.write_str(name)
    }
}

/// A window over the post store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    /// Restrict to a single author.
    pub author_id: Option<Uuid>,
    pub sort: PostSort,
    pub offset: u64,
    pub limit: u64,
}

/// One window of posts plus the size of the whole filtered listing.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: u64,
}

/// Outcome of a conditional like write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeWrite {
    /// `false` when the like set was left unchanged.
    pub applied: bool,
    pub total_likes: u64,
}

/// Post store. Every mutating method touches exactly one aggregate and
/// reports a missing post as [`RepoError::NotFound`].
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: Post) -> Result<Post, RepoError>;

    /// Load the full aggregate, likes and comments included.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    /// Hard delete of the post and everything it owns.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    async fn list(&self, query: &PostQuery) -> Result<PostPage, RepoError>;

    /// Atomically add the like unless the user already liked the post.
    async fn insert_like_if_absent(&self, post_id: Uuid, like: Like)
    -> Result<LikeWrite, RepoError>;

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeWrite, RepoError>;

    async fn append_comment(&self, post_id: Uuid, comment: Comment) -> Result<(), RepoError>;

    /// Returns `false` when the post has no such comment.
    async fn remove_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool, RepoError>;
}

/// User profile store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn save(&self, user: User) -> Result<User, RepoError>;

    /// Add `delta` to the stored post count in a single storage-side update.
    async fn adjust_post_count(&self, user_id: Uuid, delta: i64) -> Result<(), RepoError>;
}
