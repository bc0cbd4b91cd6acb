//! The posts API port and client-side errors.

use async_trait::async_trait;
use larder_shared::dto::{
    CommentDto, CreatePostRequest, FeedPageDto, FeedParams, LikeTallyDto, PostDetailDto,
};
use thiserror::Error;
use uuid::Uuid;

use crate::optimistic::MutationKey;
use crate::session::Session;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Mutation already in flight: {0}")]
    MutationInFlight(MutationKey),

    #[error("{0} is not confirmed by the server yet")]
    PendingEntity(Uuid),

    #[error("Not loaded")]
    NotLoaded,
}

impl ClientError {
    /// Transport failures and server-side errors may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Remote posts API.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn feed(&self, session: &Session, params: &FeedParams)
    -> Result<FeedPageDto, ClientError>;

    async fn posts_by_user(
        &self,
        session: &Session,
        user_id: Uuid,
        params: &FeedParams,
    ) -> Result<FeedPageDto, ClientError>;

    async fn post(&self, session: &Session, post_id: Uuid) -> Result<PostDetailDto, ClientError>;

    async fn create_post(
        &self,
        session: &Session,
        request: &CreatePostRequest,
    ) -> Result<PostDetailDto, ClientError>;

    async fn delete_post(&self, session: &Session, post_id: Uuid) -> Result<(), ClientError>;

    async fn like(&self, session: &Session, post_id: Uuid) -> Result<LikeTallyDto, ClientError>;

    async fn unlike(&self, session: &Session, post_id: Uuid)
    -> Result<LikeTallyDto, ClientError>;

    async fn add_comment(
        &self,
        session: &Session,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentDto, ClientError>;

    async fn delete_comment(
        &self,
        session: &Session,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), ClientError>;
}
