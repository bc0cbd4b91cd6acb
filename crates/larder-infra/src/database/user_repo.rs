//! PostgreSQL user profile store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DbConn, EntityTrait, QueryFilter};
use uuid::Uuid;

use larder_core::domain::User;
use larder_core::error::RepoError;
use larder_core::ports::UserRepository;

use super::entity::user;

pub struct PostgresUserRepository {
    db: Arc<DbConn>,
}

impl PostgresUserRepository {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let result = user::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn save(&self, entity: User) -> Result<User, RepoError> {
        user::Entity::insert(user::ActiveModel::from(entity.clone()))
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::Username,
                        user::Column::AvatarUrl,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| {
                let err_str = e.to_string();
                if err_str.contains("duplicate") || err_str.contains("unique") {
                    RepoError::Constraint("username already taken".to_string())
                } else {
                    RepoError::Query(err_str)
                }
            })?;

        Ok(entity)
    }

    async fn adjust_post_count(&self, user_id: Uuid, delta: i64) -> Result<(), RepoError> {
        tracing::debug!(user_id = %user_id, delta, "Adjusting post count");

        // Single UPDATE so concurrent adjustments cannot lose writes.
        let result = user::Entity::update_many()
            .col_expr(
                user::Column::PostCount,
                Expr::col(user::Column::PostCount).add(delta),
            )
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
