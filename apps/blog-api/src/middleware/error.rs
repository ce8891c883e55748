//! Error handling - every failure leaves as `{ "success": false, "message" }`.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use blog_core::DomainError;
use blog_core::error::RepoError;
use blog_core::ports::AuthError;
use blog_shared::ErrorResponse;
use uuid::Uuid;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("This action is unauthorized.")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Map a failed post operation.
    ///
    /// Client errors keep their own status. Anything else is logged with the
    /// request payload and acting user, then answered as
    /// `"<operation>: <cause>"`.
    pub fn operation(
        operation: &str,
        err: DomainError,
        request: &serde_json::Value,
        user_id: Option<Uuid>,
    ) -> Self {
        if is_client_error(&err) {
            return err.into();
        }

        let message = format!("{operation}: {err}");
        tracing::error!(
            request = %request,
            user_id = ?user_id,
            error = ?err,
            "{message}"
        );
        AppError::Internal(message)
    }
}

fn is_client_error(err: &DomainError) -> bool {
    matches!(
        err,
        DomainError::NotFound { .. }
            | DomainError::Validation(_)
            | DomainError::Duplicate(_)
            | DomainError::Forbidden { .. }
            | DomainError::InvalidTransition(_)
            | DomainError::Repository(RepoError::NotFound)
    )
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, .. } => {
                AppError::NotFound(format!("{entity_type} not found."))
            }
            DomainError::Repository(RepoError::NotFound) => {
                AppError::NotFound("Post not found.".to_string())
            }
            DomainError::Validation(msg) | DomainError::Duplicate(msg) => AppError::Validation(msg),
            DomainError::Forbidden { .. } => AppError::Forbidden,
            DomainError::InvalidTransition(msg) => AppError::Conflict(msg),
            other => {
                tracing::error!(error = ?other, "Unhandled domain error");
                AppError::Internal("Server Error".to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => AppError::Forbidden,
            AuthError::TokenExpired => {
                AppError::Unauthorized("Your authentication token has expired.".to_string())
            }
            AuthError::MissingAuth | AuthError::InvalidToken(_) => {
                AppError::Unauthorized("Unauthenticated.".to_string())
            }
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use blog_core::ports::StorageError;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.error_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_domain_errors_keep_their_status() {
        let (status, body) = body_of(DomainError::post_not_found("missing").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Post not found.");

        let (status, _) = body_of(DomainError::Forbidden { action: "update" }.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            body_of(DomainError::InvalidTransition("already deleted".to_string()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = body_of(DomainError::Validation("title".to_string()).into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_operation_failure_names_the_operation() {
        let err = DomainError::Storage(StorageError::Backend("disk full".to_string()));
        let app_err = AppError::operation(
            "Failed to create post",
            err,
            &serde_json::json!({ "title": "Hello" }),
            Some(Uuid::nil()),
        );

        let (status, body) = body_of(app_err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to create post: "));
        assert!(message.contains("disk full"));
    }

    #[actix_web::test]
    async fn test_operation_passes_client_errors_through() {
        let app_err = AppError::operation(
            "Failed to update post",
            DomainError::Forbidden { action: "update" },
            &serde_json::Value::Null,
            None,
        );
        assert!(matches!(app_err, AppError::Forbidden));
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let err: AppError = AuthError::MissingAuth.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
