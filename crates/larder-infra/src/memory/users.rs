use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use larder_core::domain::User;
use larder_core::error::RepoError;
use larder_core::ports::UserRepository;

/// In-memory profile store for when the database is not configured.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn adjust_post_count(&self, user_id: Uuid, delta: i64) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(RepoError::NotFound)?;
        user.post_count += delta;
        user.updated_at = Utc::now();
        Ok(())
    }
}
