use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recipe::RecipeSnapshot;
use crate::error::DomainError;

/// Post aggregate - a user's post together with the likes and comments it owns.
///
/// Counts are never stored; they are always derived from `likes` and
/// `comments` so they cannot drift from the lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    /// Display name captured at creation, not kept in sync with profile changes.
    pub author_name: String,
    pub body: String,
    pub image_urls: Vec<String>,
    pub recipe_ref: Option<Uuid>,
    /// Recipe title and image copied at creation when the ref resolved.
    pub recipe: Option<RecipeSnapshot>,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Like>,
    /// Chronological: insertion order.
    pub comments: Vec<Comment>,
}

/// A like on a post. Created and destroyed, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: Uuid,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post, addressable by its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub image_urls: Vec<String>,
    pub recipe_ref: Option<Uuid>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.author_id.is_nil() {
            return Err(DomainError::Validation("author id is required".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(DomainError::Validation("post body is required".to_string()));
        }
        if self.image_urls.iter().any(|url| url.trim().is_empty()) {
            return Err(DomainError::Validation(
                "image urls must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

impl Post {
    /// Create a new post from validated input.
    pub fn new(draft: NewPost, recipe: Option<RecipeSnapshot>) -> Result<Self, DomainError> {
        draft.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            author_id: draft.author_id,
            author_name: draft.author_name,
            body: draft.body.trim().to_string(),
            image_urls: draft.image_urls,
            recipe_ref: draft.recipe_ref,
            recipe,
            created_at: Utc::now(),
            likes: Vec::new(),
            comments: Vec::new(),
        })
    }

    pub fn likes_count(&self) -> u64 {
        self.likes.len() as u64
    }

    pub fn comments_count(&self) -> u64 {
        self.comments.len() as u64
    }

    pub fn has_liked(&self, user_id: Uuid) -> bool {
        self.likes.iter().any(|like| like.user_id == user_id)
    }

    /// Like state for an optional viewer; anonymous viewers never have liked.
    pub fn viewer_has_liked(&self, viewer: Option<Uuid>) -> bool {
        viewer.is_some_and(|id| self.has_liked(id))
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Insert-if-absent. Returns `false` and leaves the post untouched when
    /// the user already liked it.
    pub fn insert_like(&mut self, like: Like) -> bool {
        if self.has_liked(like.user_id) {
            return false;
        }
        self.likes.push(like);
        true
    }

    /// Returns `false` when there was no like from this user.
    pub fn remove_like(&mut self, user_id: Uuid) -> bool {
        let before = self.likes.len();
        self.likes.retain(|like| like.user_id != user_id);
        self.likes.len() != before
    }

    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn remove_comment(&mut self, comment_id: Uuid) -> Option<Comment> {
        let index = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(index))
    }

    /// Comment authors and the post author may delete a comment.
    pub fn can_delete_comment(&self, comment: &Comment, requester_id: Uuid) -> bool {
        comment.user_id == requester_id || self.is_owned_by(requester_id)
    }

    /// Condensed listing view for feeds.
    pub fn summarize(&self, viewer: Option<Uuid>) -> PostSummary {
        PostSummary {
            id: self.id,
            author_id: self.author_id,
            author_name: self.author_name.clone(),
            body: self.body.clone(),
            image_urls: self.image_urls.clone(),
            recipe_ref: self.recipe_ref,
            recipe: self.recipe.clone(),
            created_at: self.created_at,
            likes_count: self.likes_count(),
            comments_count: self.comments_count(),
            viewer_has_liked: self.viewer_has_liked(viewer),
        }
    }

    /// Full view with likes and comments.
    pub fn into_detail(self, viewer: Option<Uuid>) -> PostDetail {
        let viewer_has_liked = self.viewer_has_liked(viewer);
        PostDetail {
            likes_count: self.likes_count(),
            comments_count: self.comments_count(),
            viewer_has_liked,
            post: self,
        }
    }
}

impl Like {
    pub fn new(user_id: Uuid, user_name: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            created_at: Utc::now(),
        }
    }
}

impl Comment {
    /// Create a new comment; the text must not be blank.
    pub fn new(
        user_id: Uuid,
        user_name: impl Into<String>,
        text: &str,
    ) -> Result<Self, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::Validation(
                "comment text is required".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            user_name: user_name.into(),
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Feed entry: a post with likes and comments condensed to counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub image_urls: Vec<String>,
    pub recipe_ref: Option<Uuid>,
    pub recipe: Option<RecipeSnapshot>,
    pub created_at: DateTime<Utc>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub viewer_has_liked: bool,
}

/// Single-post view with the full like and comment lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub likes_count: u64,
    pub comments_count: u64,
    pub viewer_has_liked: bool,
}

/// Like total after a like or unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeTally {
    pub post_id: Uuid,
    pub total_likes: u64,
}
