//! Single post view with optimistic likes and comments.
//!
//! The post header and its comment list are kept in separate stores so a
//! failed comment never rolls back a like, and vice versa. Counts shown are
//! always the lengths of the lists held locally.

use std::sync::Arc;

use chrono::Utc;
use larder_shared::dto::{CommentDto, LikeDto, PostDetailDto};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ClientError, PostsApi};
use crate::optimistic::{MutationKey, OptimisticStore, Settled};
use crate::session::Session;

#[derive(Default)]
struct PostState {
    post_id: Option<Uuid>,
    header: OptimisticStore<PostDetailDto>,
    comments: OptimisticStore<CommentDto>,
}

impl PostState {
    fn current(&self) -> Result<Uuid, ClientError> {
        self.post_id.ok_or(ClientError::NotLoaded)
    }

    fn generations(&self) -> (u64, u64) {
        (self.header.generation(), self.comments.generation())
    }

    fn fill(&mut self, (header, comments): (u64, u64), mut post: PostDetailDto) {
        let loaded = std::mem::take(&mut post.comments);
        if self.header.replace(header, vec![post]) {
            self.comments.replace(comments, loaded);
        }
    }
}

pub struct PostController {
    api: Arc<dyn PostsApi>,
    session: Session,
    state: Mutex<PostState>,
}

impl PostController {
    pub fn new(api: Arc<dyn PostsApi>, session: Session) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(PostState::default()),
        }
    }

    /// Navigate to `post_id`.
    pub async fn open(&self, post_id: Uuid) -> Result<(), ClientError> {
        let generations = {
            let mut state = self.state.lock().await;
            state.post_id = Some(post_id);
            (state.header.navigate(), state.comments.navigate())
        };

        match self.api.post(&self.session, post_id).await {
            Ok(post) => {
                self.state.lock().await.fill(generations, post);
                Ok(())
            }
            Err(error) => {
                let mut state = self.state.lock().await;
                if state.header.replace(generations.0, Vec::new()) {
                    state.comments.replace(generations.1, Vec::new());
                    state.post_id = None;
                }
                Err(error)
            }
        }
    }

    /// The post as currently displayed, including pending comments.
    pub async fn view(&self) -> Option<PostDetailDto> {
        let state = self.state.lock().await;
        let mut post = state.header.items().first()?.clone();
        post.comments = state.comments.items().to_vec();
        post.comments_count = post.comments.len() as u64;
        Some(post)
    }

    pub async fn is_busy(&self, key: MutationKey) -> bool {
        let state = self.state.lock().await;
        state.header.is_in_flight(key) || state.comments.is_in_flight(key)
    }

    pub async fn toggle_like(&self) -> Result<(), ClientError> {
        let viewer = self.session.require_viewer()?.clone();

        let (post_id, ticket, liked) = {
            let mut state = self.state.lock().await;
            let post_id = state.current()?;
            let liked = state
                .header
                .get(post_id)
                .ok_or(ClientError::NotLoaded)?
                .viewer_has_liked;
            let ticket =
                state
                    .header
                    .speculate_update(MutationKey::Like(post_id), post_id, |post| {
                        if liked {
                            post.likes.retain(|like| like.user_id != viewer.user_id);
                        } else {
                            post.likes.push(LikeDto {
                                user_id: viewer.user_id,
                                user_name: viewer.username.clone(),
                                created_at: Utc::now(),
                            });
                        }
                        post.viewer_has_liked = !liked;
                        post.likes_count = post.likes.len() as u64;
                    })?;
            (post_id, ticket, liked)
        };

        let result = if liked {
            self.api.unlike(&self.session, post_id).await
        } else {
            self.api.like(&self.session, post_id).await
        };

        match result {
            Ok(tally) => {
                let mut drifted = false;
                let settled = self.state.lock().await.header.confirm(ticket, |post| {
                    post.viewer_has_liked = !liked;
                    post.likes_count = post.likes.len() as u64;
                    drifted = post.likes_count != tally.total_likes;
                });
                if settled == Settled::Applied && drifted {
                    // Others liked or unliked meanwhile; reload the list.
                    self.refresh("like tally differs from local likes").await;
                }
                Ok(())
            }
            Err(error) => {
                let settled = self.state.lock().await.header.fail(ticket);
                self.recover(settled, &error).await;
                Err(error)
            }
        }
    }

    /// Post a comment. It shows up at once under a client-generated id and
    /// is swapped for the server's comment when the server accepts it.
    pub async fn add_comment(&self, text: &str) -> Result<CommentDto, ClientError> {
        let viewer = self.session.require_viewer()?;
        let provisional = CommentDto {
            id: Uuid::new_v4(),
            user_id: viewer.user_id,
            user_name: viewer.username.clone(),
            text: text.trim().to_string(),
            created_at: Utc::now(),
        };

        let (post_id, ticket) = {
            let mut state = self.state.lock().await;
            let post_id = state.current()?;
            let key = MutationKey::AddComment(provisional.id);
            (post_id, state.comments.speculate_insert(key, provisional)?)
        };

        match self.api.add_comment(&self.session, post_id, text).await {
            Ok(comment) => {
                let mut state = self.state.lock().await;
                state
                    .comments
                    .confirm(ticket, |pending| *pending = comment.clone());
                Ok(comment)
            }
            Err(error) => {
                let settled = self.state.lock().await.comments.fail(ticket);
                self.recover(settled, &error).await;
                Err(error)
            }
        }
    }

    /// Delete a comment. Comments the server has not confirmed yet cannot
    /// be deleted.
    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<(), ClientError> {
        self.session.require_viewer()?;

        let (post_id, ticket) = {
            let mut state = self.state.lock().await;
            let post_id = state.current()?;
            if state
                .comments
                .is_in_flight(MutationKey::AddComment(comment_id))
            {
                return Err(ClientError::PendingEntity(comment_id));
            }
            let ticket = state
                .comments
                .speculate_remove(MutationKey::DeleteComment(comment_id), comment_id)?;
            (post_id, ticket)
        };

        match self
            .api
            .delete_comment(&self.session, post_id, comment_id)
            .await
        {
            Ok(()) => {
                self.state.lock().await.comments.confirm(ticket, |_| {});
                Ok(())
            }
            Err(error) => {
                let settled = self.state.lock().await.comments.fail(ticket);
                self.recover(settled, &error).await;
                Err(error)
            }
        }
    }

    async fn recover(&self, settled: Settled, error: &ClientError) {
        if settled == Settled::Applied {
            self.refresh(&error.to_string()).await;
        }
    }

    /// Reload the open post. Changes still in flight stay applied on top.
    async fn refresh(&self, reason: &str) {
        let (post_id, generations) = {
            let state = self.state.lock().await;
            match state.post_id {
                Some(post_id) => (post_id, state.generations()),
                None => return,
            }
        };
        tracing::debug!(%post_id, reason, "Refetching post");

        match self.api.post(&self.session, post_id).await {
            Ok(post) => self.state.lock().await.fill(generations, post),
            Err(refetch_error) => {
                tracing::warn!(%post_id, error = %refetch_error, "Post refetch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, server_error, signed_in, viewer};

    async fn opened(api: Arc<FakeApi>) -> (PostController, Uuid) {
        let post_id = api.post_ids()[0];
        let controller = PostController::new(api, signed_in());
        controller.open(post_id).await.unwrap();
        (controller, post_id)
    }

    #[tokio::test]
    async fn test_open_loads_comments() {
        let api = Arc::new(FakeApi::with_posts(1));
        let post_id = api.post_ids()[0];
        api.seed_comment(post_id, Uuid::new_v4(), "first");

        let (controller, _) = opened(api.clone()).await;

        let view = controller.view().await.unwrap();
        assert_eq!(view.id, post_id);
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments_count, 1);
    }

    #[tokio::test]
    async fn test_toggle_like_updates_like_list() {
        let api = Arc::new(FakeApi::with_posts(1));
        let (controller, _) = opened(api.clone()).await;

        controller.toggle_like().await.unwrap();

        let view = controller.view().await.unwrap();
        assert!(view.viewer_has_liked);
        assert_eq!(view.likes_count, 1);
        assert_eq!(view.likes[0].user_id, viewer().user_id);
    }

    #[tokio::test]
    async fn test_pending_comment_is_replaced_by_server_comment() {
        let (api, gate) = FakeApi::with_posts(1).gated();
        let api = Arc::new(api);
        let (controller, post_id) = opened(api.clone()).await;
        let controller = Arc::new(controller);

        let adding = tokio::spawn({
            let controller = controller.clone();
            async move { controller.add_comment("  yum  ").await }
        });
        let provisional = loop {
            if let Some(comment) = controller.view().await.and_then(|v| v.comments.first().cloned()) {
                break comment;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(provisional.text, "yum");
        assert!(controller.is_busy(MutationKey::AddComment(provisional.id)).await);

        let early_delete = controller.delete_comment(provisional.id).await;
        assert!(matches!(early_delete, Err(ClientError::PendingEntity(id)) if id == provisional.id));

        gate.notify_one();
        let confirmed = adding.await.unwrap().unwrap();

        assert_ne!(confirmed.id, provisional.id);
        let view = controller.view().await.unwrap();
        let ids: Vec<Uuid> = view.comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![confirmed.id]);
        assert_eq!(api.stored(post_id).unwrap().comments.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_comment_is_rolled_back() {
        let api = Arc::new(FakeApi::with_posts(1));
        let (controller, _) = opened(api.clone()).await;
        api.fail_next(server_error());

        let result = controller.add_comment("hello").await;

        assert!(result.is_err());
        assert!(controller.view().await.unwrap().comments.is_empty());
        assert_eq!(api.calls("post"), 2);
    }

    #[tokio::test]
    async fn test_forbidden_comment_delete_restores_comment() {
        let api = Arc::new(FakeApi::with_posts(1));
        let post_id = api.post_ids()[0];
        let first = api.seed_comment(post_id, Uuid::new_v4(), "first");
        let second = api.seed_comment(post_id, Uuid::new_v4(), "second");
        let (controller, _) = opened(api.clone()).await;
        api.fail_next(ClientError::Api {
            status: 403,
            message: "Not allowed to delete this comment".to_string(),
        });

        let result = controller.delete_comment(first.id).await;

        assert!(matches!(result, Err(ClientError::Api { status: 403, .. })));
        let ids: Vec<Uuid> = controller
            .view()
            .await
            .unwrap()
            .comments
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_delete_comment_removes_it() {
        let api = Arc::new(FakeApi::with_posts(1));
        let post_id = api.post_ids()[0];
        let comment = api.seed_comment(post_id, viewer().user_id, "oops");
        let (controller, _) = opened(api.clone()).await;

        controller.delete_comment(comment.id).await.unwrap();

        assert!(controller.view().await.unwrap().comments.is_empty());
        assert!(api.stored(post_id).unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn test_failed_comment_keeps_like_in_flight() {
        let (api, gate) = FakeApi::with_posts(1).gated();
        let api = Arc::new(api);
        let (controller, post_id) = opened(api.clone()).await;
        let controller = Arc::new(controller);
        api.fail_next(server_error());

        let adding = tokio::spawn({
            let controller = controller.clone();
            async move { controller.add_comment("too salty").await }
        });
        while controller.view().await.is_some_and(|v| v.comments.is_empty()) {
            tokio::task::yield_now().await;
        }
        let liking = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle_like().await }
        });
        while !controller.is_busy(MutationKey::Like(post_id)).await {
            tokio::task::yield_now().await;
        }

        gate.notify_one();
        assert!(adding.await.unwrap().is_err());
        assert_eq!(api.calls("post"), 2);

        let during = controller.view().await.unwrap();
        assert!(during.comments.is_empty());
        assert!(during.viewer_has_liked);
        assert_eq!(during.likes_count, 1);

        gate.notify_one();
        liking.await.unwrap().unwrap();

        let view = controller.view().await.unwrap();
        assert!(view.viewer_has_liked);
        assert_eq!(view.likes.len(), 1);
        assert_eq!(view.likes_count, 1);
    }

    #[tokio::test]
    async fn test_like_count_follows_like_list_when_others_liked() {
        let api = Arc::new(FakeApi::with_posts(1));
        let (controller, post_id) = opened(api.clone()).await;
        api.seed_like(post_id, Uuid::new_v4());

        controller.toggle_like().await.unwrap();

        let view = controller.view().await.unwrap();
        assert!(view.viewer_has_liked);
        assert_eq!(view.likes.len(), 2);
        assert_eq!(view.likes_count, 2);
        assert_eq!(api.calls("post"), 2);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_nothing_loaded() {
        let api = Arc::new(FakeApi::with_posts(2));
        let (controller, _) = opened(api.clone()).await;
        api.fail_next_read(server_error());

        let result = controller.open(api.post_ids()[1]).await;

        assert!(matches!(result, Err(ClientError::Api { status: 500, .. })));
        assert!(controller.view().await.is_none());
        assert!(matches!(
            controller.add_comment("hi").await,
            Err(ClientError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn test_actions_before_open_are_not_loaded() {
        let api = Arc::new(FakeApi::with_posts(1));
        let controller = PostController::new(api, signed_in());

        assert!(matches!(
            controller.toggle_like().await,
            Err(ClientError::NotLoaded)
        ));
        assert!(matches!(
            controller.add_comment("hi").await,
            Err(ClientError::NotLoaded)
        ));
        assert!(controller.view().await.is_none());
    }
}
