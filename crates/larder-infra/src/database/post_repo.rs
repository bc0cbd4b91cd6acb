//! PostgreSQL post store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DbConn, DbErr, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use larder_core::domain::{Comment, Like, Post, RecipeSnapshot};
use larder_core::error::RepoError;
use larder_core::ports::{LikeWrite, PostPage, PostQuery, PostRepository, SortDirection, SortField};

use super::entity::{post, post_comment, post_like};

const LIKES_COUNT: &str =
    "(SELECT COUNT(*) FROM post_likes WHERE post_likes.post_id = posts.id)";
const COMMENTS_COUNT: &str =
    "(SELECT COUNT(*) FROM post_comments WHERE post_comments.post_id = posts.id)";

/// Post aggregates stored across `posts`, `post_likes` and `post_comments`.
pub struct PostgresPostRepository {
    db: Arc<DbConn>,
}

impl PostgresPostRepository {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }

    async fn ensure_exists(&self, post_id: Uuid) -> Result<(), RepoError> {
        post::Entity::find_by_id(post_id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<u64, RepoError> {
        post_like::Entity::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Load likes and comments for a set of posts, grouped by post id.
    async fn load_children(
        &self,
        post_ids: Vec<Uuid>,
    ) -> Result<
        (
            HashMap<Uuid, Vec<post_like::Model>>,
            HashMap<Uuid, Vec<post_comment::Model>>,
        ),
        RepoError,
    > {
        let likes = post_like::Entity::find()
            .filter(post_like::Column::PostId.is_in(post_ids.clone()))
            .order_by_asc(post_like::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        let comments = post_comment::Entity::find()
            .filter(post_comment::Column::PostId.is_in(post_ids))
            .order_by_asc(post_comment::Column::CreatedAt)
            .order_by_asc(post_comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        let mut likes_by_post: HashMap<Uuid, Vec<post_like::Model>> = HashMap::new();
        for like in likes {
            likes_by_post.entry(like.post_id).or_default().push(like);
        }
        let mut comments_by_post: HashMap<Uuid, Vec<post_comment::Model>> = HashMap::new();
        for comment in comments {
            comments_by_post.entry(comment.post_id).or_default().push(comment);
        }

        Ok((likes_by_post, comments_by_post))
    }
}

fn map_db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => RepoError::NotFound,
        Some(SqlErr::UniqueConstraintViolation(msg)) => RepoError::Constraint(msg),
        _ => match err {
            DbErr::Conn(e) => RepoError::Connection(e.to_string()),
            DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
            other => RepoError::Query(other.to_string()),
        },
    }
}

fn to_domain(
    model: post::Model,
    likes: Vec<post_like::Model>,
    comments: Vec<post_comment::Model>,
) -> Result<Post, RepoError> {
    let image_urls: Vec<String> = serde_json::from_value(model.image_urls)
        .map_err(|e| RepoError::Query(format!("malformed image_urls: {e}")))?;

    let recipe = match (model.recipe_id, model.recipe_title) {
        (Some(recipe_id), Some(title)) => Some(RecipeSnapshot {
            recipe_id,
            title,
            image_url: model.recipe_image_url,
        }),
        _ => None,
    };

    Ok(Post {
        id: model.id,
        author_id: model.author_id,
        author_name: model.author_name,
        body: model.body,
        image_urls,
        recipe_ref: model.recipe_id,
        recipe,
        created_at: model.created_at.into(),
        likes: likes
            .into_iter()
            .map(|like| Like {
                user_id: like.user_id,
                user_name: like.user_name,
                created_at: like.created_at.into(),
            })
            .collect(),
        comments: comments
            .into_iter()
            .map(|comment| Comment {
                id: comment.id,
                user_id: comment.user_id,
                user_name: comment.user_name,
                text: comment.text,
                created_at: comment.created_at.into(),
            })
            .collect(),
    })
}

fn post_row(post: &Post) -> post::ActiveModel {
    post::ActiveModel {
        id: Set(post.id),
        author_id: Set(post.author_id),
        author_name: Set(post.author_name.clone()),
        body: Set(post.body.clone()),
        image_urls: Set(serde_json::Value::from(post.image_urls.clone())),
        recipe_id: Set(post.recipe_ref),
        recipe_title: Set(post.recipe.as_ref().map(|r| r.title.clone())),
        recipe_image_url: Set(post.recipe.as_ref().and_then(|r| r.image_url.clone())),
        created_at: Set(post.created_at.into()),
    }
}

fn like_row(post_id: Uuid, like: &Like) -> post_like::ActiveModel {
    post_like::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(like.user_id),
        user_name: Set(like.user_name.clone()),
        created_at: Set(like.created_at.into()),
    }
}

fn comment_row(post_id: Uuid, comment: &Comment) -> post_comment::ActiveModel {
    post_comment::ActiveModel {
        id: Set(comment.id),
        post_id: Set(post_id),
        user_id: Set(comment.user_id),
        user_name: Set(comment.user_name.clone()),
        text: Set(comment.text.clone()),
        created_at: Set(comment.created_at.into()),
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        post::Entity::insert(post_row(&post))
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;

        if !post.likes.is_empty() {
            post_like::Entity::insert_many(post.likes.iter().map(|l| like_row(post.id, l)))
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
        }
        if !post.comments.is_empty() {
            post_comment::Entity::insert_many(
                post.comments.iter().map(|c| comment_row(post.id, c)),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;
        }

        txn.commit().await.map_err(map_db_err)?;
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let (mut likes, mut comments) = self.load_children(vec![id]).await?;
        let post = to_domain(
            model,
            likes.remove(&id).unwrap_or_default(),
            comments.remove(&id).unwrap_or_default(),
        )?;
        Ok(Some(post))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = post::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, query: &PostQuery) -> Result<PostPage, RepoError> {
        let mut select = post::Entity::find();
        if let Some(author_id) = query.author_id {
            select = select.filter(post::Column::AuthorId.eq(author_id));
        }

        let total = select.clone().count(self.db.as_ref()).await.map_err(map_db_err)?;

        let order = match query.sort.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        select = match query.sort.field {
            SortField::CreatedAt => select.order_by(post::Column::CreatedAt, order.clone()),
            SortField::Likes => select.order_by(Expr::cust(LIKES_COUNT), order.clone()),
            SortField::Comments => select.order_by(Expr::cust(COMMENTS_COUNT), order.clone()),
        };

        let models = select
            .order_by(post::Column::Id, order)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        if models.is_empty() {
            return Ok(PostPage {
                posts: Vec::new(),
                total,
            });
        }

        let ids = models.iter().map(|m| m.id).collect();
        let (mut likes, mut comments) = self.load_children(ids).await?;

        let posts = models
            .into_iter()
            .map(|model| {
                let id = model.id;
                to_domain(
                    model,
                    likes.remove(&id).unwrap_or_default(),
                    comments.remove(&id).unwrap_or_default(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PostPage { posts, total })
    }

    async fn insert_like_if_absent(
        &self,
        post_id: Uuid,
        like: Like,
    ) -> Result<LikeWrite, RepoError> {
        self.ensure_exists(post_id).await?;

        let inserted = post_like::Entity::insert(like_row(post_id, &like))
            .on_conflict(
                OnConflict::columns([post_like::Column::PostId, post_like::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(LikeWrite {
            applied: inserted > 0,
            total_likes: self.count_likes(post_id).await?,
        })
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeWrite, RepoError> {
        self.ensure_exists(post_id).await?;

        let result = post_like::Entity::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(LikeWrite {
            applied: result.rows_affected > 0,
            total_likes: self.count_likes(post_id).await?,
        })
    }

    async fn append_comment(&self, post_id: Uuid, comment: Comment) -> Result<(), RepoError> {
        self.ensure_exists(post_id).await?;

        post_comment::Entity::insert(comment_row(post_id, &comment))
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn remove_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool, RepoError> {
        self.ensure_exists(post_id).await?;

        let result = post_comment::Entity::delete_many()
            .filter(post_comment::Column::PostId.eq(post_id))
            .filter(post_comment::Column::Id.eq(comment_id))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected > 0)
    }
}
