//! Feed assembly: paginated, sortable listings annotated with the viewer's
//! like state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PostDetail, PostSummary};
use crate::error::DomainError;
use crate::ports::{PostQuery, PostRepository, PostSort};

/// Page size limits.
#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
        }
    }
}

/// A feed request; `None` page or limit fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: PostSort,
    pub viewer: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_posts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<PostSummary>,
    pub pagination: Pagination,
}

pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(posts: Arc<dyn PostRepository>, config: FeedConfig) -> Self {
        Self { posts, config }
    }

    pub async fn get_feed(&self, request: FeedRequest) -> Result<FeedPage, DomainError> {
        self.assemble(None, request).await
    }

    /// One author's posts, newest first.
    pub async fn get_posts_by_user(
        &self,
        user_id: Uuid,
        page: Option<u64>,
        limit: Option<u64>,
        viewer: Option<Uuid>,
    ) -> Result<FeedPage, DomainError> {
        let request = FeedRequest {
            page,
            limit,
            sort: PostSort::newest_first(),
            viewer,
        };
        self.assemble(Some(user_id), request).await
    }

    pub async fn get_post_by_id(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<PostDetail, DomainError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(post_id))?;

        Ok(post.into_detail(viewer))
    }

    async fn assemble(
        &self,
        author_id: Option<Uuid>,
        request: FeedRequest,
    ) -> Result<FeedPage, DomainError> {
        let (page, limit) = self.window(request.page, request.limit)?;
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| DomainError::Validation("page is out of range".to_string()))?;

        let query = PostQuery {
            author_id,
            sort: request.sort,
            offset,
            limit,
        };
        let result = self.posts.list(&query).await?;

        tracing::debug!(
            page,
            limit,
            sort = %request.sort.field,
            total = result.total,
            "Feed assembled"
        );

        Ok(FeedPage {
            posts: result
                .posts
                .iter()
                .map(|post| post.summarize(request.viewer))
                .collect(),
            pagination: Pagination {
                current_page: page,
                total_pages: result.total.div_ceil(limit),
                total_posts: result.total,
            },
        })
    }

    fn window(&self, page: Option<u64>, limit: Option<u64>) -> Result<(u64, u64), DomainError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(self.config.default_limit);

        if page == 0 {
            return Err(DomainError::Validation("page must be at least 1".to_string()));
        }
        if limit == 0 || limit > self.config.max_limit {
            return Err(DomainError::Validation(format!(
                "limit must be between 1 and {}",
                self.config.max_limit
            )));
        }
        Ok((page, limit))
    }
}
