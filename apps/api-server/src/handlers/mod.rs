//! HTTP handlers and route configuration.

mod health;
mod posts;

use actix_web::{error, web};

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        error::Error::from(AppError::BadRequest(err.to_string()))
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        error::Error::from(AppError::BadRequest(err.to_string()))
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        error::Error::from(AppError::BadRequest(err.to_string()))
    }))
    .service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/posts")
                    .route("", web::post().to(posts::create_post))
                    .route("/feed", web::get().to(posts::get_feed))
                    .route("/user/{user_id}", web::get().to(posts::get_posts_by_user))
                    .route("/{post_id}", web::get().to(posts::get_post))
                    .route("/{post_id}", web::delete().to(posts::delete_post))
                    .route("/{post_id}/likes", web::post().to(posts::like_post))
                    .route("/{post_id}/likes", web::delete().to(posts::unlike_post))
                    .route("/{post_id}/comments", web::post().to(posts::add_comment))
                    .route(
                        "/{post_id}/comments/{comment_id}",
                        web::delete().to(posts::delete_comment),
                    ),
            ),
    );
}
