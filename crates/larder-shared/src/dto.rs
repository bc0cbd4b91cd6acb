//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a post. The author comes from the bearer token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub body: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<Uuid>,
}

/// Request to comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

/// Query string of the feed and by-user listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl FeedParams {
    pub fn page(page: u64) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSnapshotDto {
    pub recipe_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeDto {
    pub user_id: Uuid,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Feed entry with likes and comments condensed to counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummaryDto {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeSnapshotDto>,
    pub created_at: DateTime<Utc>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub viewer_has_liked: bool,
}

/// A single post with its full like and comment lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailDto {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeSnapshotDto>,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<LikeDto>,
    pub comments: Vec<CommentDto>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub viewer_has_liked: bool,
}

/// Like total returned by like and unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeTallyDto {
    pub post_id: Uuid,
    pub total_likes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_posts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPageDto {
    pub posts: Vec<PostSummaryDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_optional_fields() {
        let request: CreatePostRequest =
            serde_json::from_str(r#"{"body":"Pasta night!"}"#).unwrap();

        assert_eq!(request.body, "Pasta night!");
        assert!(request.image_urls.is_empty());
        assert!(request.recipe_id.is_none());
    }

    #[test]
    fn test_feed_params_use_camel_case() {
        let params = FeedParams {
            page: Some(2),
            sort_by: Some("likes".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&params).unwrap();

        assert_eq!(json, serde_json::json!({"page": 2, "sortBy": "likes"}));
    }

    #[test]
    fn test_pagination_field_names() {
        let pagination = PaginationDto {
            current_page: 1,
            total_pages: 3,
            total_posts: 25,
        };

        let json = serde_json::to_value(pagination).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"currentPage": 1, "totalPages": 3, "totalPosts": 25})
        );
    }
}
