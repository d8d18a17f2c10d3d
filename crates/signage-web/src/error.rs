use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use signage_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Auth(String),
    /// Missing or mismatched anti-forgery token.
    Forbidden(String),
    NotFound(String),
    /// Login refused while locked out; carries the seconds left.
    Throttled(i64),
    Persistence(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Throttled(secs) => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many login attempts. Try again in {secs} seconds."),
            ),
            AppError::Persistence(msg) => {
                tracing::error!("Save failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save changes".to_string(),
                )
            }
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => AppError::Validation(msg),
            CoreError::Auth(msg) => AppError::Auth(msg),
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::Persistence(msg) => AppError::Persistence(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", e);
        AppError::Internal("Internal server error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_matching_status() {
        let cases = [
            (CoreError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (CoreError::Auth("no".into()), StatusCode::UNAUTHORIZED),
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                CoreError::Persistence("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn throttled_is_429() {
        let resp = AppError::Throttled(42).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
