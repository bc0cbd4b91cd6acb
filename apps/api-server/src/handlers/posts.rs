//! Post, like, comment and feed handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use larder_core::domain::{
    Comment, Like, LikeTally, NewPost, PostDetail, PostSummary, RecipeSnapshot,
};
use larder_core::ports::{PostSort, SortDirection, SortField};
use larder_core::service::{FeedPage, FeedRequest};
use larder_shared::ApiResponse;
use larder_shared::dto::{
    AddCommentRequest, CommentDto, CreatePostRequest, FeedPageDto, FeedParams, LikeDto,
    LikeTallyDto, PaginationDto, PostDetailDto, PostSummaryDto, RecipeSnapshotDto,
};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    let viewer = identity.user_id;

    let post = state
        .posts
        .create_post(NewPost {
            author_id: identity.user_id,
            author_name: identity.username,
            body: request.body,
            image_urls: request.image_urls,
            recipe_ref: request.recipe_id,
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(detail_dto(post.into_detail(Some(viewer))))))
}

/// GET /api/posts/feed?page&limit&sortBy&order
pub async fn get_feed(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    params: web::Query<FeedParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();

    let page = state
        .feed
        .get_feed(FeedRequest {
            page: params.page,
            limit: params.limit,
            sort: sort_from(&params)?,
            viewer: identity.user_id(),
        })
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(feed_dto(page))))
}

/// GET /api/posts/user/{user_id}?page&limit
pub async fn get_posts_by_user(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
    params: web::Query<FeedParams>,
) -> AppResult<HttpResponse> {
    let page = state
        .feed
        .get_posts_by_user(
            path.into_inner(),
            params.page,
            params.limit,
            identity.user_id(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(feed_dto(page))))
}

/// GET /api/posts/{post_id}
pub async fn get_post(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let detail = state
        .feed
        .get_post_by_id(path.into_inner(), identity.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(detail_dto(detail))))
}

/// DELETE /api/posts/{post_id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete_post(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Post deleted")))
}

/// POST /api/posts/{post_id}/likes
pub async fn like_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let tally = state
        .posts
        .like_post(path.into_inner(), identity.user_id, &identity.username)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(tally_dto(tally))))
}

/// DELETE /api/posts/{post_id}/likes
pub async fn unlike_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let tally = state
        .posts
        .unlike_post(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(tally_dto(tally))))
}

/// POST /api/posts/{post_id}/comments
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<AddCommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .posts
        .add_comment(
            path.into_inner(),
            identity.user_id,
            &identity.username,
            &body.text,
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(comment_dto(comment))))
}

/// DELETE /api/posts/{post_id}/comments/{comment_id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    state
        .posts
        .delete_comment(post_id, comment_id, identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Comment deleted")))
}

fn sort_from(params: &FeedParams) -> AppResult<PostSort> {
    let field = params
        .sort_by
        .as_deref()
        .map(str::parse::<SortField>)
        .transpose()?
        .unwrap_or_default();
    let direction = params
        .order
        .as_deref()
        .map(str::parse::<SortDirection>)
        .transpose()?
        .unwrap_or_default();

    Ok(PostSort { field, direction })
}

fn recipe_dto(recipe: RecipeSnapshot) -> RecipeSnapshotDto {
    RecipeSnapshotDto {
        recipe_id: recipe.recipe_id,
        title: recipe.title,
        image_url: recipe.image_url,
    }
}

fn like_dto(like: Like) -> LikeDto {
    LikeDto {
        user_id: like.user_id,
        user_name: like.user_name,
        created_at: like.created_at,
    }
}

fn comment_dto(comment: Comment) -> CommentDto {
    CommentDto {
        id: comment.id,
        user_id: comment.user_id,
        user_name: comment.user_name,
        text: comment.text,
        created_at: comment.created_at,
    }
}

fn tally_dto(tally: LikeTally) -> LikeTallyDto {
    LikeTallyDto {
        post_id: tally.post_id,
        total_likes: tally.total_likes,
    }
}

fn summary_dto(summary: PostSummary) -> PostSummaryDto {
    PostSummaryDto {
        id: summary.id,
        author_id: summary.author_id,
        author_name: summary.author_name,
        body: summary.body,
        image_urls: summary.image_urls,
        recipe_id: summary.recipe_ref,
        recipe: summary.recipe.map(recipe_dto),
        created_at: summary.created_at,
        likes_count: summary.likes_count,
        comments_count: summary.comments_count,
        viewer_has_liked: summary.viewer_has_liked,
    }
}

fn detail_dto(detail: PostDetail) -> PostDetailDto {
    let post = detail.post;
    PostDetailDto {
        id: post.id,
        author_id: post.author_id,
        author_name: post.author_name,
        body: post.body,
        image_urls: post.image_urls,
        recipe_id: post.recipe_ref,
        recipe: post.recipe.map(recipe_dto),
        created_at: post.created_at,
        likes: post.likes.into_iter().map(like_dto).collect(),
        comments: post.comments.into_iter().map(comment_dto).collect(),
        likes_count: detail.likes_count,
        comments_count: detail.comments_count,
        viewer_has_liked: detail.viewer_has_liked,
    }
}

fn feed_dto(page: FeedPage) -> FeedPageDto {
    FeedPageDto {
        posts: page.posts.into_iter().map(summary_dto).collect(),
        pagination: PaginationDto {
            current_page: page.pagination.current_page,
            total_pages: page.pagination.total_pages,
            total_posts: page.pagination.total_posts,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use larder_core::service::FeedConfig;
    use larder_infra::{JwtConfig, JwtTokenService};
    use serde_json::{Value, json};

    use super::*;
    use crate::handlers::configure_routes;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    macro_rules! send {
        ($app:expr, $req:expr) => {{
            let res = test::call_service(&$app, $req.to_request()).await;
            let status = res.status();
            let body: Value = test::read_body_json(res).await;
            (status, body)
        }};
    }

    fn state() -> AppState {
        AppState::in_memory(
            Arc::new(JwtTokenService::new(JwtConfig::default())),
            FeedConfig::default(),
        )
    }

    fn bearer(state: &AppState, user_id: Uuid, username: &str) -> (&'static str, String) {
        let token = state
            .tokens
            .generate_token(user_id, username)
            .unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    fn post_id(body: &Value) -> String {
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[actix_rt::test]
    async fn test_health() {
        let state = state();
        let app = app!(state);

        let (status, body) = send!(app, test::TestRequest::get().uri("/api/health"));

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["status"], "ok");
    }

    #[actix_rt::test]
    async fn test_create_requires_token() {
        let state = state();
        let app = app!(state);

        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/posts")
                .set_json(json!({"body": "Pasta night!"}))
        );

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
    }

    #[actix_rt::test]
    async fn test_pasta_night_over_http() {
        let state = state();
        let app = app!(state);
        let author = bearer(&state, Uuid::new_v4(), "nonna");
        let fan = bearer(&state, Uuid::new_v4(), "fan");

        let (status, created) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(author.clone())
                .set_json(json!({"body": "Pasta night!", "imageUrls": ["https://img/p.jpg"]}))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["likesCount"], 0);
        assert_eq!(created["data"]["imageUrls"][0], "https://img/p.jpg");
        let id = post_id(&created);
        let likes = format!("/api/posts/{id}/likes");

        let (status, liked) = send!(
            app,
            test::TestRequest::post().uri(&likes).insert_header(fan.clone())
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(liked["data"]["totalLikes"], 1);

        let (status, again) = send!(
            app,
            test::TestRequest::post().uri(&likes).insert_header(fan.clone())
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["status"], "error");

        let (_, feed) = send!(
            app,
            test::TestRequest::get()
                .uri("/api/posts/feed")
                .insert_header(fan.clone())
        );
        assert_eq!(feed["data"]["posts"][0]["likesCount"], 1);
        assert_eq!(feed["data"]["posts"][0]["viewerHasLiked"], true);
        assert_eq!(feed["data"]["pagination"]["totalPosts"], 1);

        let (status, unliked) = send!(
            app,
            test::TestRequest::delete().uri(&likes).insert_header(fan)
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unliked["data"]["totalLikes"], 0);
    }

    #[actix_rt::test]
    async fn test_comment_deletion_rules() {
        let state = state();
        let app = app!(state);
        let owner = bearer(&state, Uuid::new_v4(), "owner");
        let commenter = bearer(&state, Uuid::new_v4(), "u");
        let stranger = bearer(&state, Uuid::new_v4(), "v");

        let (_, created) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(owner)
                .set_json(json!({"body": "tacos"}))
        );
        let id = post_id(&created);

        let (status, comment) = send!(
            app,
            test::TestRequest::post()
                .uri(&format!("/api/posts/{id}/comments"))
                .insert_header(commenter.clone())
                .set_json(json!({"text": "yum"}))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["data"]["text"], "yum");
        let comment_id = comment["data"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/posts/{id}/comments/{comment_id}");

        let (status, _) = send!(
            app,
            test::TestRequest::delete().uri(&uri).insert_header(stranger)
        );
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, detail) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/posts/{id}"))
        );
        assert_eq!(detail["data"]["commentsCount"], 1);

        let (status, _) = send!(
            app,
            test::TestRequest::delete().uri(&uri).insert_header(commenter)
        );
        assert_eq!(status, StatusCode::OK);

        let (_, detail) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/posts/{id}"))
        );
        assert_eq!(detail["data"]["comments"], json!([]));
    }

    #[actix_rt::test]
    async fn test_only_author_deletes_post() {
        let state = state();
        let app = app!(state);
        let author = bearer(&state, Uuid::new_v4(), "nonna");
        let other = bearer(&state, Uuid::new_v4(), "other");

        let (_, created) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(author.clone())
                .set_json(json!({"body": "risotto"}))
        );
        let uri = format!("/api/posts/{}", post_id(&created));

        let (status, _) = send!(app, test::TestRequest::delete().uri(&uri).insert_header(other));
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send!(app, test::TestRequest::delete().uri(&uri).insert_header(author));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Post deleted");

        let (status, _) = send!(app, test::TestRequest::get().uri(&uri));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_feed_rejects_bad_window_and_sort() {
        let state = state();
        let app = app!(state);

        for uri in [
            "/api/posts/feed?limit=0",
            "/api/posts/feed?page=0",
            "/api/posts/feed?limit=500",
            "/api/posts/feed?sortBy=bogus",
            "/api/posts/feed?order=sideways",
            "/api/posts/feed?page=abc",
        ] {
            let (status, body) = send!(app, test::TestRequest::get().uri(uri));
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["status"], "error");
        }
    }

    #[actix_rt::test]
    async fn test_posts_by_user_and_unknown_post() {
        let state = state();
        let app = app!(state);
        let alice_id = Uuid::new_v4();
        let alice = bearer(&state, alice_id, "alice");
        let bob = bearer(&state, Uuid::new_v4(), "bob");

        for (header, body) in [(alice.clone(), "one"), (bob, "two"), (alice, "three")] {
            let (status, _) = send!(
                app,
                test::TestRequest::post()
                    .uri("/api/posts")
                    .insert_header(header)
                    .set_json(json!({ "body": body }))
            );
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, listing) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/posts/user/{alice_id}?limit=1"))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["data"]["posts"][0]["body"], "three");
        assert_eq!(listing["data"]["pagination"]["totalPosts"], 2);
        assert_eq!(listing["data"]["pagination"]["totalPages"], 2);

        let (status, _) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/posts/{}", Uuid::new_v4()))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send!(app, test::TestRequest::get().uri("/api/posts/not-a-uuid"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
