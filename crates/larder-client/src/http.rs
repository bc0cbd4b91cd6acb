//! `PostsApi` over HTTP with reqwest.

use async_trait::async_trait;
use larder_shared::dto::{
    AddCommentRequest, CommentDto, CreatePostRequest, FeedPageDto, FeedParams, LikeTallyDto,
    PostDetailDto,
};
use larder_shared::{ApiResponse, ErrorResponse};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::{ClientError, PostsApi};
use crate::session::Session;

pub struct HttpPostsApi {
    client: reqwest::Client,
}

impl HttpPostsApi {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, session.url(path));
        match session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Option<T>, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        decode(status, &body)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        self.send(builder)
            .await?
            .ok_or_else(|| ClientError::Decode("response carries no data".to_string()))
    }
}

impl Default for HttpPostsApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a response body: the success envelope's `data`, or the error
/// envelope's message for non-2xx statuses.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<Option<T>, ClientError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorResponse>(body)
            .map(|error| error.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        tracing::debug!(status = status.as_u16(), %message, "API request failed");
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))?;
    if !envelope.is_success() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }
    Ok(envelope.data)
}

#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn feed(
        &self,
        session: &Session,
        params: &FeedParams,
    ) -> Result<FeedPageDto, ClientError> {
        let request = self
            .request(session, Method::GET, "/api/posts/feed")
            .query(params);
        self.fetch(request).await
    }

    async fn posts_by_user(
        &self,
        session: &Session,
        user_id: Uuid,
        params: &FeedParams,
    ) -> Result<FeedPageDto, ClientError> {
        let path = format!("/api/posts/user/{user_id}");
        let request = self.request(session, Method::GET, &path).query(params);
        self.fetch(request).await
    }

    async fn post(&self, session: &Session, post_id: Uuid) -> Result<PostDetailDto, ClientError> {
        let path = format!("/api/posts/{post_id}");
        self.fetch(self.request(session, Method::GET, &path)).await
    }

    async fn create_post(
        &self,
        session: &Session,
        request: &CreatePostRequest,
    ) -> Result<PostDetailDto, ClientError> {
        let request = self
            .request(session, Method::POST, "/api/posts")
            .json(request);
        self.fetch(request).await
    }

    async fn delete_post(&self, session: &Session, post_id: Uuid) -> Result<(), ClientError> {
        let path = format!("/api/posts/{post_id}");
        self.send::<serde_json::Value>(self.request(session, Method::DELETE, &path))
            .await?;
        Ok(())
    }

    async fn like(&self, session: &Session, post_id: Uuid) -> Result<LikeTallyDto, ClientError> {
        let path = format!("/api/posts/{post_id}/likes");
        self.fetch(self.request(session, Method::POST, &path)).await
    }

    async fn unlike(
        &self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeTallyDto, ClientError> {
        let path = format!("/api/posts/{post_id}/likes");
        self.fetch(self.request(session, Method::DELETE, &path)).await
    }

    async fn add_comment(
        &self,
        session: &Session,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentDto, ClientError> {
        let path = format!("/api/posts/{post_id}/comments");
        let body = AddCommentRequest {
            text: text.to_string(),
        };
        let request = self.request(session, Method::POST, &path).json(&body);
        self.fetch(request).await
    }

    async fn delete_comment(
        &self,
        session: &Session,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), ClientError> {
        let path = format!("/api/posts/{post_id}/comments/{comment_id}");
        self.send::<serde_json::Value>(self.request(session, Method::DELETE, &path))
            .await?;
        Ok(())
    }
}
