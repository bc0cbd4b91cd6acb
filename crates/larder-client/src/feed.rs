//! Feed view state with optimistic likes and deletes.

use std::sync::Arc;

use larder_shared::dto::{FeedParams, PaginationDto, PostSummaryDto};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ClientError, PostsApi};
use crate::optimistic::{MutationKey, OptimisticStore, Settled};
use crate::session::Session;

#[derive(Default)]
struct FeedState {
    store: OptimisticStore<PostSummaryDto>,
    params: FeedParams,
    pagination: Option<PaginationDto>,
}

pub struct FeedController {
    api: Arc<dyn PostsApi>,
    session: Session,
    state: Mutex<FeedState>,
}

impl FeedController {
    pub fn new(api: Arc<dyn PostsApi>, session: Session) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Navigate to `page`, keeping the current sort.
    pub async fn load(&self, page: u64) -> Result<(), ClientError> {
        let params = {
            let state = self.state.lock().await;
            FeedParams {
                page: Some(page),
                ..state.params.clone()
            }
        };
        self.load_with(params).await
    }

    /// Navigate to the listing described by `params`. When the fetch fails
    /// the view is left empty; the previous page is not shown under the new
    /// parameters.
    pub async fn load_with(&self, params: FeedParams) -> Result<(), ClientError> {
        let generation = {
            let mut state = self.state.lock().await;
            state.params = params.clone();
            state.store.navigate()
        };

        let result = self.api.feed(&self.session, &params).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(page) => {
                if state.store.replace(generation, page.posts) {
                    state.pagination = Some(page.pagination);
                }
                Ok(())
            }
            Err(error) => {
                if state.store.replace(generation, Vec::new()) {
                    state.pagination = None;
                }
                Err(error)
            }
        }
    }

    pub async fn posts(&self) -> Vec<PostSummaryDto> {
        self.state.lock().await.store.items().to_vec()
    }

    pub async fn pagination(&self) -> Option<PaginationDto> {
        self.state.lock().await.pagination
    }

    pub async fn is_busy(&self, key: MutationKey) -> bool {
        self.state.lock().await.store.is_in_flight(key)
    }

    /// Like or unlike `post_id` depending on its current local state.
    pub async fn toggle_like(&self, post_id: Uuid) -> Result<(), ClientError> {
        self.session.require_viewer()?;

        let (ticket, liked) = {
            let mut state = self.state.lock().await;
            let liked = state
                .store
                .get(post_id)
                .ok_or(ClientError::NotLoaded)?
                .viewer_has_liked;
            let ticket = state
                .store
                .speculate_update(MutationKey::Like(post_id), post_id, |post| {
                    post.viewer_has_liked = !liked;
                    post.likes_count = if liked {
                        post.likes_count.saturating_sub(1)
                    } else {
                        post.likes_count + 1
                    };
                })?;
            (ticket, liked)
        };

        let result = if liked {
            self.api.unlike(&self.session, post_id).await
        } else {
            self.api.like(&self.session, post_id).await
        };

        match result {
            Ok(tally) => {
                let mut state = self.state.lock().await;
                state.store.confirm(ticket, |post| {
                    post.viewer_has_liked = !liked;
                    post.likes_count = tally.total_likes;
                });
                Ok(())
            }
            Err(error) => {
                let settled = self.state.lock().await.store.fail(ticket);
                self.recover(settled, &error).await;
                Err(error)
            }
        }
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<(), ClientError> {
        self.session.require_viewer()?;

        let ticket = {
            let mut state = self.state.lock().await;
            state
                .store
                .speculate_remove(MutationKey::DeletePost(post_id), post_id)?
        };

        match self.api.delete_post(&self.session, post_id).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                if state.store.confirm(ticket, |_| {}) == Settled::Applied {
                    if let Some(pagination) = state.pagination.as_mut() {
                        pagination.total_posts = pagination.total_posts.saturating_sub(1);
                    }
                }
                Ok(())
            }
            Err(error) => {
                let settled = self.state.lock().await.store.fail(ticket);
                self.recover(settled, &error).await;
                Err(error)
            }
        }
    }

    /// After a rollback, reload the current page so local state matches
    /// the server again.
    async fn recover(&self, settled: Settled, error: &ClientError) {
        if settled == Settled::Stale {
            return;
        }
        tracing::debug!(%error, "Rolled back feed change, refetching");

        let (generation, params) = {
            let state = self.state.lock().await;
            (state.store.generation(), state.params.clone())
        };

        match self.api.feed(&self.session, &params).await {
            Ok(page) => {
                let mut state = self.state.lock().await;
                if state.store.replace(generation, page.posts) {
                    state.pagination = Some(page.pagination);
                }
            }
            Err(refetch_error) => {
                tracing::warn!(error = %refetch_error, "Feed refetch after rollback failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, server_error, signed_in};

    async fn controller(api: Arc<FakeApi>) -> FeedController {
        let controller = FeedController::new(api, signed_in());
        controller.load(1).await.unwrap();
        controller
    }

    async fn wait_until_busy(controller: &FeedController, key: MutationKey) {
        while !controller.is_busy(key).await {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_load_fills_page_and_pagination() {
        let api = Arc::new(FakeApi::with_posts(12));

        let feed = controller(api.clone()).await;

        assert_eq!(feed.posts().await.len(), 10);
        let pagination = feed.pagination().await.unwrap();
        assert_eq!(pagination.total_pages, 2);
        assert_eq!(pagination.total_posts, 12);
    }

    #[tokio::test]
    async fn test_toggle_like_applies_and_confirms() {
        let api = Arc::new(FakeApi::with_posts(1));
        let feed = controller(api.clone()).await;
        let post_id = api.post_ids()[0];

        feed.toggle_like(post_id).await.unwrap();

        let post = &feed.posts().await[0];
        assert!(post.viewer_has_liked);
        assert_eq!(post.likes_count, 1);
        assert!(!feed.is_busy(MutationKey::Like(post_id)).await);

        feed.toggle_like(post_id).await.unwrap();
        let post = &feed.posts().await[0];
        assert!(!post.viewer_has_liked);
        assert_eq!(post.likes_count, 0);
    }

    #[tokio::test]
    async fn test_failed_like_rolls_back_and_refetches() {
        let api = Arc::new(FakeApi::with_posts(2));
        let feed = controller(api.clone()).await;
        let post_id = api.post_ids()[0];
        api.fail_next(server_error());

        let result = feed.toggle_like(post_id).await;

        assert!(matches!(result, Err(ClientError::Api { status: 500, .. })));
        let post = &feed.posts().await[0];
        assert!(!post.viewer_has_liked);
        assert_eq!(post.likes_count, 0);
        assert_eq!(api.calls("feed"), 2);
    }

    #[tokio::test]
    async fn test_double_click_is_refused_while_in_flight() {
        let (api, gate) = FakeApi::with_posts(1).gated();
        let api = Arc::new(api);
        let feed = Arc::new(controller(api.clone()).await);
        let post_id = api.post_ids()[0];

        let first = tokio::spawn({
            let feed = feed.clone();
            async move { feed.toggle_like(post_id).await }
        });
        wait_until_busy(&feed, MutationKey::Like(post_id)).await;

        let second = feed.toggle_like(post_id).await;
        assert!(matches!(second, Err(ClientError::MutationInFlight(_))));

        gate.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(api.calls("like"), 1);
        assert_eq!(feed.posts().await[0].likes_count, 1);
    }

    #[tokio::test]
    async fn test_answer_after_navigation_is_ignored() {
        let (api, gate) = FakeApi::with_posts(15).gated();
        let api = Arc::new(api);
        let feed = Arc::new(controller(api.clone()).await);
        let post_id = api.post_ids()[0];
        api.fail_next(server_error());

        let pending = tokio::spawn({
            let feed = feed.clone();
            async move { feed.toggle_like(post_id).await }
        });
        wait_until_busy(&feed, MutationKey::Like(post_id)).await;

        feed.load(2).await.unwrap();
        let second_page: Vec<Uuid> = feed.posts().await.iter().map(|p| p.id).collect();

        gate.notify_one();
        assert!(pending.await.unwrap().is_err());

        let after: Vec<Uuid> = feed.posts().await.iter().map(|p| p.id).collect();
        assert_eq!(after, second_page);
        assert_eq!(after.len(), 5);
        assert_eq!(api.calls("feed"), 2);
    }

    #[tokio::test]
    async fn test_refetch_after_failure_keeps_other_like_in_flight() {
        let (api, gate) = FakeApi::with_posts(2).gated();
        let api = Arc::new(api);
        let feed = Arc::new(controller(api.clone()).await);
        let (liked, doomed) = (api.post_ids()[0], api.post_ids()[1]);
        api.fail_next(server_error());

        let delete = tokio::spawn({
            let feed = feed.clone();
            async move { feed.delete_post(doomed).await }
        });
        wait_until_busy(&feed, MutationKey::DeletePost(doomed)).await;
        let like = tokio::spawn({
            let feed = feed.clone();
            async move { feed.toggle_like(liked).await }
        });
        wait_until_busy(&feed, MutationKey::Like(liked)).await;

        gate.notify_one();
        assert!(delete.await.unwrap().is_err());
        assert_eq!(api.calls("feed"), 2);

        let during = feed.posts().await;
        assert!(during[0].viewer_has_liked);
        assert_eq!(during[0].likes_count, 1);
        assert_eq!(during[1].id, doomed);

        gate.notify_one();
        like.await.unwrap().unwrap();

        let post = &feed.posts().await[0];
        assert!(post.viewer_has_liked);
        assert_eq!(post.likes_count, 1);
        assert_eq!(api.stored(liked).unwrap().likes.len(), 1);

        gate.notify_one();
        feed.toggle_like(liked).await.unwrap();
        assert_eq!(api.calls("unlike"), 1);
        assert!(!feed.posts().await[0].viewer_has_liked);
    }

    #[tokio::test]
    async fn test_failed_load_clears_previous_page() {
        let api = Arc::new(FakeApi::with_posts(15));
        let feed = controller(api.clone()).await;
        api.fail_next_read(server_error());

        let result = feed.load(2).await;

        assert!(matches!(result, Err(ClientError::Api { status: 500, .. })));
        assert!(feed.posts().await.is_empty());
        assert!(feed.pagination().await.is_none());
        assert!(matches!(
            feed.toggle_like(api.post_ids()[0]).await,
            Err(ClientError::NotLoaded)
        ));

        feed.load(2).await.unwrap();
        assert_eq!(feed.posts().await.len(), 5);
        assert_eq!(feed.pagination().await.unwrap().current_page, 2);
    }

    #[tokio::test]
    async fn test_failed_delete_restores_post_in_place() {
        let api = Arc::new(FakeApi::with_posts(3));
        let feed = controller(api.clone()).await;
        let ids = api.post_ids();
        api.fail_next(ClientError::Api {
            status: 403,
            message: "Not the author".to_string(),
        });

        let result = feed.delete_post(ids[1]).await;

        assert!(matches!(result, Err(ClientError::Api { status: 403, .. })));
        let listed: Vec<Uuid> = feed.posts().await.iter().map(|p| p.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_delete_removes_post() {
        let api = Arc::new(FakeApi::with_posts(3));
        let feed = controller(api.clone()).await;
        let target = api.post_ids()[1];

        feed.delete_post(target).await.unwrap();

        assert!(feed.posts().await.iter().all(|p| p.id != target));
        assert_eq!(feed.pagination().await.unwrap().total_posts, 2);
        assert!(api.stored(target).is_none());
    }

    #[tokio::test]
    async fn test_anonymous_like_is_refused() {
        let api = Arc::new(FakeApi::with_posts(1));
        let feed = FeedController::new(api.clone(), Session::anonymous("http://larder.test"));
        feed.load(1).await.unwrap();

        let result = feed.toggle_like(api.post_ids()[0]).await;

        assert!(matches!(result, Err(ClientError::NotSignedIn)));
        assert_eq!(api.calls("like"), 0);
    }

    #[tokio::test]
    async fn test_like_before_load_is_not_loaded() {
        let api = Arc::new(FakeApi::with_posts(1));
        let feed = FeedController::new(api.clone(), signed_in());

        let result = feed.toggle_like(api.post_ids()[0]).await;

        assert!(matches!(result, Err(ClientError::NotLoaded)));
    }
}
