//! Scripted in-process `PostsApi` for controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use larder_shared::dto::{
    CommentDto, CreatePostRequest, FeedPageDto, FeedParams, LikeDto, LikeTallyDto, PaginationDto,
    PostDetailDto, PostSummaryDto,
};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::api::{ClientError, PostsApi};
use crate::session::{Session, Viewer};

pub(crate) fn viewer() -> Viewer {
    Viewer {
        user_id: Uuid::from_u128(1),
        username: "viewer".to_string(),
    }
}

pub(crate) fn signed_in() -> Session {
    Session::signed_in("http://larder.test", "token", viewer())
}

pub(crate) fn server_error() -> ClientError {
    ClientError::Api {
        status: 500,
        message: "Internal server error".to_string(),
    }
}

/// Holds posts newest first and behaves like the server, except that
/// queued failures are returned by the next mutations (or reads) and an
/// optional gate holds every mutation until released.
#[derive(Default)]
pub(crate) struct FakeApi {
    posts: Mutex<Vec<PostDetailDto>>,
    failures: Mutex<VecDeque<ClientError>>,
    read_failures: Mutex<VecDeque<ClientError>>,
    calls: Mutex<Vec<&'static str>>,
    gate: Option<Arc<Notify>>,
}

impl FakeApi {
    pub fn with_posts(count: usize) -> Self {
        let start = Utc::now();
        let posts = (0..count)
            .map(|i| PostDetailDto {
                id: Uuid::new_v4(),
                author_id: Uuid::from_u128(2),
                author_name: "cook".to_string(),
                body: format!("post #{i}"),
                image_urls: Vec::new(),
                recipe_id: None,
                recipe: None,
                created_at: start - Duration::minutes(i as i64),
                likes: Vec::new(),
                comments: Vec::new(),
                likes_count: 0,
                comments_count: 0,
                viewer_has_liked: false,
            })
            .collect();

        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn fail_next(&self, error: ClientError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_read(&self, error: ClientError) {
        self.read_failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    pub fn post_ids(&self) -> Vec<Uuid> {
        self.posts.lock().unwrap().iter().map(|p| p.id).collect()
    }

    pub fn stored(&self, post_id: Uuid) -> Option<PostDetailDto> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
    }

    /// Seed a comment directly on the server side.
    pub fn seed_comment(&self, post_id: Uuid, user_id: Uuid, text: &str) -> CommentDto {
        let comment = CommentDto {
            id: Uuid::new_v4(),
            user_id,
            user_name: "someone".to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.with_post(post_id, |post| {
            post.comments.push(comment.clone());
            Ok(())
        })
        .unwrap();
        comment
    }

    /// Seed a like from another user directly on the server side.
    pub fn seed_like(&self, post_id: Uuid, user_id: Uuid) {
        self.with_post(post_id, |post| {
            post.likes.push(LikeDto {
                user_id,
                user_name: "someone".to_string(),
                created_at: Utc::now(),
            });
            Ok(())
        })
        .unwrap();
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn read(&self, name: &'static str) -> Result<(), ClientError> {
        self.record(name);
        match self.read_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn mutation(&self, name: &'static str) -> Result<(), ClientError> {
        self.record(name);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn with_post<T>(
        &self,
        post_id: Uuid,
        f: impl FnOnce(&mut PostDetailDto) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| not_found("Post"))?;
        f(post)
    }
}

fn not_found(entity: &str) -> ClientError {
    ClientError::Api {
        status: 404,
        message: format!("{entity} not found"),
    }
}

fn view(post: &PostDetailDto, session: &Session) -> PostDetailDto {
    let mut post = post.clone();
    post.likes_count = post.likes.len() as u64;
    post.comments_count = post.comments.len() as u64;
    post.viewer_has_liked = session
        .viewer()
        .is_some_and(|v| post.likes.iter().any(|l| l.user_id == v.user_id));
    post
}

fn summarize(post: PostDetailDto) -> PostSummaryDto {
    PostSummaryDto {
        id: post.id,
        author_id: post.author_id,
        author_name: post.author_name,
        body: post.body,
        image_urls: post.image_urls,
        recipe_id: post.recipe_id,
        recipe: post.recipe,
        created_at: post.created_at,
        likes_count: post.likes_count,
        comments_count: post.comments_count,
        viewer_has_liked: post.viewer_has_liked,
    }
}

#[async_trait]
impl PostsApi for FakeApi {
    async fn feed(
        &self,
        session: &Session,
        params: &FeedParams,
    ) -> Result<FeedPageDto, ClientError> {
        self.read("feed")?;
        let page = params.page.unwrap_or(1);
        let limit = params.limit.unwrap_or(10);
        let posts = self.posts.lock().unwrap();
        let total = posts.len() as u64;

        Ok(FeedPageDto {
            posts: posts
                .iter()
                .skip(((page - 1) * limit) as usize)
                .take(limit as usize)
                .map(|p| summarize(view(p, session)))
                .collect(),
            pagination: PaginationDto {
                current_page: page,
                total_pages: total.div_ceil(limit),
                total_posts: total,
            },
        })
    }

    async fn posts_by_user(
        &self,
        session: &Session,
        _user_id: Uuid,
        params: &FeedParams,
    ) -> Result<FeedPageDto, ClientError> {
        self.feed(session, params).await
    }

    async fn post(&self, session: &Session, post_id: Uuid) -> Result<PostDetailDto, ClientError> {
        self.read("post")?;
        self.with_post(post_id, |post| Ok(view(post, session)))
    }

    async fn create_post(
        &self,
        _session: &Session,
        _request: &CreatePostRequest,
    ) -> Result<PostDetailDto, ClientError> {
        unimplemented!("controllers never create posts")
    }

    async fn delete_post(&self, _session: &Session, post_id: Uuid) -> Result<(), ClientError> {
        self.mutation("delete_post").await?;
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != post_id);
        if posts.len() == before {
            return Err(not_found("Post"));
        }
        Ok(())
    }

    async fn like(&self, session: &Session, post_id: Uuid) -> Result<LikeTallyDto, ClientError> {
        self.mutation("like").await?;
        let viewer = session.require_viewer()?.clone();
        self.with_post(post_id, |post| {
            if post.likes.iter().any(|l| l.user_id == viewer.user_id) {
                return Err(ClientError::Api {
                    status: 409,
                    message: "Post already liked".to_string(),
                });
            }
            post.likes.push(LikeDto {
                user_id: viewer.user_id,
                user_name: viewer.username,
                created_at: Utc::now(),
            });
            Ok(LikeTallyDto {
                post_id,
                total_likes: post.likes.len() as u64,
            })
        })
    }

    async fn unlike(
        &self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeTallyDto, ClientError> {
        self.mutation("unlike").await?;
        let viewer = session.require_viewer()?.clone();
        self.with_post(post_id, |post| {
            let before = post.likes.len();
            post.likes.retain(|l| l.user_id != viewer.user_id);
            if post.likes.len() == before {
                return Err(ClientError::Api {
                    status: 409,
                    message: "Post not liked".to_string(),
                });
            }
            Ok(LikeTallyDto {
                post_id,
                total_likes: post.likes.len() as u64,
            })
        })
    }

    async fn add_comment(
        &self,
        session: &Session,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentDto, ClientError> {
        self.mutation("add_comment").await?;
        let viewer = session.require_viewer()?.clone();
        self.with_post(post_id, |post| {
            let comment = CommentDto {
                id: Uuid::new_v4(),
                user_id: viewer.user_id,
                user_name: viewer.username,
                text: text.trim().to_string(),
                created_at: Utc::now(),
            };
            post.comments.push(comment.clone());
            Ok(comment)
        })
    }

    async fn delete_comment(
        &self,
        _session: &Session,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), ClientError> {
        self.mutation("delete_comment").await?;
        self.with_post(post_id, |post| {
            let before = post.comments.len();
            post.comments.retain(|c| c.id != comment_id);
            if post.comments.len() == before {
                return Err(not_found("Comment"));
            }
            Ok(())
        })
    }
}
