//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! It centralizes error management, providing a consistent way to handle and represent
//! the failure taxonomy of the service: validation problems, authentication failures,
//! concealed ownership failures, duplicate accounts, spent reset tokens and
//! infrastructure trouble in the database or the job queue.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies.
//! Infrastructure errors are logged with their cause and rendered with a generic
//! message so storage or queue internals never reach the client.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Message returned for every rejected bearer token, whatever the reason.
pub const INVALID_TOKEN: &str = "Invalid or expired token";
/// Message returned when no bearer token accompanies a protected request.
pub const MISSING_TOKEN: &str = "Authorization header not present";
/// Message returned for failed logins; never says which half was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
/// Message shared by absent and foreign tasks.
pub const TASK_NOT_FOUND: &str = "Task not found";

/// Result alias used by repositories, services and handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific type of error, often carrying a message
/// detailing the issue. These errors are then converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid, expired or revoked credentials (HTTP 401).
    Unauthorized(String),
    /// Represents a client-side error due to a malformed request (HTTP 400).
    BadRequest(String),
    /// A password reset token that is unknown, already used or expired (HTTP 400).
    /// The three cases are deliberately indistinguishable.
    InvalidResetToken,
    /// Represents a situation where a requested resource was not found (HTTP 404).
    /// Also used for resources owned by somebody else.
    NotFound(String),
    /// The request collides with existing state, e.g. a duplicate email (HTTP 409).
    Conflict(String),
    /// Represents an error due to failed input validation (HTTP 422 Unprocessable Entity).
    ValidationError(String),
    /// Represents an error originating from database operations (HTTP 500).
    DatabaseError(String),
    /// The job queue rejected or lost a message (HTTP 500).
    QueueError(String),
    /// A bounded wait on the database or queue elapsed (HTTP 503). Safe to retry.
    ServiceUnavailable(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
}

impl AppError {
    /// The rejection used for any bearer token that does not resolve to a live session.
    pub fn invalid_token() -> Self {
        AppError::Unauthorized(INVALID_TOKEN.into())
    }

    /// The rejection shared by absent tasks and tasks owned by another person.
    pub fn task_not_found() -> Self {
        AppError::NotFound(TASK_NOT_FOUND.into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::InvalidResetToken => write!(f, "Bad Request: {}", INVALID_TOKEN),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::QueueError(msg) => write!(f, "Queue Error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Client errors echo their message. Server errors log the cause and answer with a
/// generic body.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_)
            | AppError::QueueError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ValidationError(msg) => msg.clone(),
            AppError::InvalidResetToken => INVALID_TOKEN.to_string(),
            AppError::ServiceUnavailable(cause) => {
                log::warn!("Dependency timed out: {}", cause);
                "Service temporarily unavailable".to_string()
            }
            AppError::DatabaseError(cause)
            | AppError::QueueError(cause)
            | AppError::InternalServerError(cause) => {
                log::error!("{}", cause);
                "Internal server error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// SQLSTATE Postgres reports when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Converts `sqlx::Error` into `AppError`.
///
/// An exhausted pool wait or a statement cancelled by the server-side timeout becomes
/// `ServiceUnavailable` so callers may retry.
/// Unique violations are mapped by the repositories that know which constraint fired.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("database pool timed out".into())
            }
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                AppError::ServiceUnavailable(format!("database statement timed out: {}", db))
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> AppError {
        AppError::DatabaseError(format!("migration failed: {}", error))
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `jsonwebtoken::errors::Error` into the uniform token rejection.
///
/// The library's reason (expired, bad signature, malformed) is dropped on purpose.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        log::debug!("Rejected bearer token: {}", error);
        AppError::invalid_token()
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(error: redis::RedisError) -> AppError {
        AppError::QueueError(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> AppError {
        AppError::InternalServerError(format!("serialization failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_error_responses() {
        let cases = vec![
            (AppError::Unauthorized("Invalid token".into()), 401),
            (AppError::BadRequest("Invalid input".into()), 400),
            (AppError::InvalidResetToken, 400),
            (AppError::NotFound("Resource not found".into()), 404),
            (AppError::Conflict("Email already registered".into()), 409),
            (AppError::ValidationError("title".into()), 422),
            (AppError::DatabaseError("connection reset".into()), 500),
            (AppError::QueueError("broken pipe".into()), 500),
            (AppError::ServiceUnavailable("pool timed out".into()), 503),
            (AppError::InternalServerError("Server error".into()), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(error.error_response().status(), expected, "{}", error);
        }
    }

    #[actix_rt::test]
    async fn test_server_errors_do_not_leak_cause() {
        let response = AppError::DatabaseError("relation \"persons\" does not exist".into())
            .error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let error = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, AppError::ServiceUnavailable(_)));
    }

    #[derive(Debug)]
    struct PgFailure(&'static str);

    impl fmt::Display for PgFailure {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "SQLSTATE {}", self.0)
        }
    }

    impl std::error::Error for PgFailure {}

    impl sqlx::error::DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "statement failed"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    #[test]
    fn test_cancelled_statement_is_retryable() {
        let cancelled = AppError::from(sqlx::Error::Database(Box::new(PgFailure("57014"))));
        assert!(matches!(cancelled, AppError::ServiceUnavailable(_)));
        assert_eq!(cancelled.error_response().status(), 503);

        let other = AppError::from(sqlx::Error::Database(Box::new(PgFailure("42P01"))));
        assert!(matches!(other, AppError::DatabaseError(_)));
    }

    #[test]
    fn test_concealed_failures_share_messages() {
        assert_eq!(AppError::task_not_found().to_string(), "Not Found: Task not found");
        assert_eq!(
            AppError::invalid_token().to_string(),
            format!("Unauthorized: {}", INVALID_TOKEN)
        );
    }
}
