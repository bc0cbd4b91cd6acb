//! Post mutation service: create, delete, like, unlike, comment, uncomment.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Comment, Like, LikeTally, NewPost, Post, RecipeSnapshot};
use crate::error::{DomainError, RepoError};
use crate::ports::{PostRepository, RecipeCatalog, UserRepository};

/// Validates and applies post mutations. Each mutation is a single write
/// against one aggregate, so a failed call can be resubmitted as a whole.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    recipes: Arc<dyn RecipeCatalog>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        recipes: Arc<dyn RecipeCatalog>,
    ) -> Self {
        Self {
            posts,
            users,
            recipes,
        }
    }

    pub async fn create_post(&self, draft: NewPost) -> Result<Post, DomainError> {
        draft.validate()?;

        let recipe = match draft.recipe_ref {
            Some(recipe_id) => self.resolve_recipe(recipe_id).await,
            None => None,
        };

        let post = self.posts.insert(Post::new(draft, recipe)?).await?;
        self.adjust_post_count(post.author_id, 1).await;

        tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post created");
        Ok(post)
    }

    pub async fn delete_post(&self, post_id: Uuid, requester_id: Uuid) -> Result<(), DomainError> {
        let post = self.load(post_id).await?;
        if !post.is_owned_by(requester_id) {
            return Err(DomainError::Forbidden(
                "only the author can delete this post".to_string(),
            ));
        }

        self.posts
            .delete(post_id)
            .await
            .map_err(missing_post(post_id))?;
        self.adjust_post_count(post.author_id, -1).await;

        tracing::info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    /// Fails with a conflict when the user already liked the post.
    pub async fn like_post(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        user_name: &str,
    ) -> Result<LikeTally, DomainError> {
        let write = self
            .posts
            .insert_like_if_absent(post_id, Like::new(user_id, user_name))
            .await
            .map_err(missing_post(post_id))?;

        if !write.applied {
            return Err(DomainError::Conflict("post already liked".to_string()));
        }

        tracing::debug!(post_id = %post_id, user_id = %user_id, total = write.total_likes, "Post liked");
        Ok(LikeTally {
            post_id,
            total_likes: write.total_likes,
        })
    }

    /// Fails with a conflict when there is no like to remove.
    pub async fn unlike_post(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeTally, DomainError> {
        let write = self
            .posts
            .remove_like(post_id, user_id)
            .await
            .map_err(missing_post(post_id))?;

        if !write.applied {
            return Err(DomainError::Conflict("post not liked".to_string()));
        }

        tracing::debug!(post_id = %post_id, user_id = %user_id, total = write.total_likes, "Post unliked");
        Ok(LikeTally {
            post_id,
            total_likes: write.total_likes,
        })
    }

    /// Returns only the new comment so callers can append it to their view.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        user_name: &str,
        text: &str,
    ) -> Result<Comment, DomainError> {
        let comment = Comment::new(user_id, user_name, text)?;

        self.posts
            .append_comment(post_id, comment.clone())
            .await
            .map_err(missing_post(post_id))?;

        tracing::debug!(post_id = %post_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        requester_id: Uuid,
    ) -> Result<(), DomainError> {
        let post = self.load(post_id).await?;
        let comment = post
            .comment(comment_id)
            .ok_or_else(|| DomainError::comment_not_found(comment_id))?;

        if !post.can_delete_comment(comment, requester_id) {
            return Err(DomainError::Forbidden(
                "only the comment author or post author can delete this comment".to_string(),
            ));
        }

        let removed = self
            .posts
            .remove_comment(post_id, comment_id)
            .await
            .map_err(missing_post(post_id))?;
        if !removed {
            // Deleted concurrently between the check and the write.
            return Err(DomainError::comment_not_found(comment_id));
        }

        tracing::debug!(post_id = %post_id, comment_id = %comment_id, "Comment deleted");
        Ok(())
    }

    async fn load(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(post_id))
    }

    async fn resolve_recipe(&self, recipe_id: Uuid) -> Option<RecipeSnapshot> {
        match self.recipes.find_snapshot(recipe_id).await {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => {
                tracing::debug!(recipe_id = %recipe_id, "Recipe not found, storing bare reference");
                None
            }
            Err(e) => {
                tracing::warn!(recipe_id = %recipe_id, error = %e, "Recipe lookup failed");
                None
            }
        }
    }

    /// The post counter belongs to the profile store; a failure there must
    /// not undo the post mutation.
    async fn adjust_post_count(&self, user_id: Uuid, delta: i64) {
        if let Err(e) = self.users.adjust_post_count(user_id, delta).await {
            tracing::warn!(user_id = %user_id, delta, error = %e, "Failed to adjust post count");
        }
    }
}

fn missing_post(post_id: Uuid) -> impl FnOnce(RepoError) -> DomainError {
    move |err| match err {
        RepoError::NotFound => DomainError::post_not_found(post_id),
        other => other.into(),
    }
}
