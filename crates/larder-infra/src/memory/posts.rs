//! In-memory post store.
//!
//! Used when no database is configured and by the service tests.
//! Note: Data is lost on process restart.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use larder_core::domain::{Comment, Like, Post};
use larder_core::error::RepoError;
use larder_core::ports::{
    LikeWrite, PostPage, PostQuery, PostRepository, PostSort, SortDirection, SortField,
};

/// Post aggregates keyed by id behind a single async RwLock.
///
/// Every mutation takes the write lock for its whole check-and-apply, which
/// makes like insertion an atomic insert-if-absent.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Post, b: &Post, sort: PostSort) -> Ordering {
    let primary = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Likes => a.likes.len().cmp(&b.likes.len()),
        SortField::Comments => a.comments.len().cmp(&b.comments.len()),
    };
    let ordering = primary.then_with(|| a.id.cmp(&b.id));

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(RepoError::Constraint("post already exists".to_string()));
        }
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.posts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self, query: &PostQuery) -> Result<PostPage, RepoError> {
        let posts = self.posts.read().await;

        let mut matching: Vec<&Post> = posts
            .values()
            .filter(|post| query.author_id.is_none_or(|author| post.author_id == author))
            .collect();
        matching.sort_by(|a, b| compare(a, b, query.sort));

        let total = matching.len() as u64;
        let window = matching
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(PostPage {
            posts: window,
            total,
        })
    }

    async fn insert_like_if_absent(
        &self,
        post_id: Uuid,
        like: Like,
    ) -> Result<LikeWrite, RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;

        let applied = post.insert_like(like);
        Ok(LikeWrite {
            applied,
            total_likes: post.likes_count(),
        })
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeWrite, RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;

        let applied = post.remove_like(user_id);
        Ok(LikeWrite {
            applied,
            total_likes: post.likes_count(),
        })
    }

    async fn append_comment(&self, post_id: Uuid, comment: Comment) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        post.push_comment(comment);
        Ok(())
    }

    async fn remove_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool, RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        Ok(post.remove_comment(comment_id).is_some())
    }
}
