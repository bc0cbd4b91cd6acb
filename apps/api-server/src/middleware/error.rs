//! Error handling - every failure renders the `{status: "error", message}`
//! envelope.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use larder_core::DomainError;
use larder_core::ports::AuthError;
use larder_shared::ErrorResponse;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Malformed request that never reached a service.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Too many requests, retry in {retry_after_secs} seconds")]
    TooManyRequests { retry_after_secs: u64 },
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::Domain(DomainError::Storage(detail)) => {
                tracing::error!(%detail, "Storage failure");
                ErrorResponse::internal_error()
            }
            other => ErrorResponse::new(other.to_string()),
        };

        let mut response = HttpResponse::build(self.status_code());
        if let AppError::TooManyRequests { retry_after_secs } = self {
            response
                .insert_header(("Retry-After", retry_after_secs.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"));
        }
        response.json(error)
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use uuid::Uuid;

    async fn render(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.error_response();
        let status = response.status();
        let body = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[actix_rt::test]
    async fn test_domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (DomainError::post_not_found(Uuid::nil()), StatusCode::NOT_FOUND),
            (DomainError::Conflict("x".into()), StatusCode::CONFLICT),
            (DomainError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status_code(), expected);
        }
    }

    #[actix_rt::test]
    async fn test_storage_detail_is_not_leaked() {
        let (status, body) =
            render(DomainError::Storage("connection refused on 10.0.0.5".into()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Internal server error");
    }

    #[actix_rt::test]
    async fn test_rate_limit_sets_retry_after() {
        let response = AppError::TooManyRequests {
            retry_after_secs: 7,
        }
        .error_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "7");
    }

    #[actix_rt::test]
    async fn test_not_found_message() {
        let id = Uuid::new_v4();

        let (_, body) = render(DomainError::post_not_found(id).into()).await;

        assert_eq!(body["message"], format!("Post with id {id} not found"));
    }
}
