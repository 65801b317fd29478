use axum::{
    Json,
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{ticket::TicketError, user::UserError},
};
use services::services::{
    auth::AuthError, ticket::TicketServiceError, user::UserServiceError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Register not found id: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Every failure that is not about identity or permissions is reported
        // as a bad request.
        let (status_code, error_type) = match &self {
            ApiError::Database(_) => (StatusCode::BAD_REQUEST, "DatabaseError"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::BAD_REQUEST, "NotFound"),
            ApiError::Internal(_) => (StatusCode::BAD_REQUEST, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
        };

        if matches!(self, ApiError::Database(_) | ApiError::Internal(_)) {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }

        let response = match self {
            ApiError::Validation(errors) => ApiResponse::<()>::errors(errors),
            ApiError::Unauthorized => ApiResponse::<()>::error("Unauthorized"),
            ApiError::NotFound(id) => {
                ApiResponse::<()>::error(&format!("Register not found id: {id}"))
            }
            ApiError::BadRequest(msg) | ApiError::Forbidden(msg) | ApiError::Internal(msg) => {
                ApiResponse::<()>::error(&msg)
            }
            ApiError::Database(err) => ApiResponse::<()>::error(&err.to_string()),
        };
        (status_code, Json(response)).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<TicketServiceError> for ApiError {
    fn from(err: TicketServiceError) -> Self {
        match err {
            TicketServiceError::Database(db_err) => ApiError::Database(db_err),
            TicketServiceError::Ticket(TicketError::Database(db_err)) => ApiError::Database(db_err),
            TicketServiceError::Ticket(ticket_err) => ApiError::BadRequest(ticket_err.to_string()),
            TicketServiceError::Validation(errors) => ApiError::Validation(errors),
            TicketServiceError::NotFound(id) => ApiError::NotFound(id.to_string()),
            TicketServiceError::Forbidden(_) => {
                ApiError::Forbidden("Ticket belongs to another user".to_string())
            }
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Database(db_err) => ApiError::Database(db_err),
            UserServiceError::User(UserError::Database(db_err)) => ApiError::Database(db_err),
            UserServiceError::User(user_err) => ApiError::Validation(vec![user_err.to_string()]),
            UserServiceError::Validation(errors) => ApiError::Validation(errors),
            UserServiceError::NotFound(id) => ApiError::NotFound(id.to_string()),
            UserServiceError::Hash(_) | UserServiceError::HashTask(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Unauthorized | AuthError::Jwt(_) => {
                ApiError::Unauthorized
            }
            AuthError::Database(db_err) => ApiError::Database(db_err),
            AuthError::Password(user_err) => ApiError::from(user_err),
        }
    }
}
