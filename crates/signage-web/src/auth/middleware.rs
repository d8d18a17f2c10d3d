use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::session::{session_id_from_headers, Session};
use crate::error::AppError;
use crate::state::AppState;

/// A live session, logged in or not.
pub struct SessionContext {
    pub session_id: String,
    pub session: Session,
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id = session_id_from_headers(&parts.headers).ok_or_else(expired_token)?;
        let session = state
            .session_store
            .get(&session_id)
            .ok_or_else(expired_token)?;

        Ok(SessionContext {
            session_id,
            session,
        })
    }
}

/// A session that belongs to a logged-in administrator.
pub struct AdminContext {
    pub session_id: String,
    pub username: String,
    pub csrf_token: String,
}

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let not_logged_in = || AppError::Auth("Please log in".to_string());

        let session_id = session_id_from_headers(&parts.headers).ok_or_else(not_logged_in)?;
        let session = state
            .session_store
            .get(&session_id)
            .ok_or_else(not_logged_in)?;
        let username = session.admin_username.ok_or_else(not_logged_in)?;

        Ok(AdminContext {
            session_id,
            username,
            csrf_token: session.csrf_token,
        })
    }
}

fn expired_token() -> AppError {
    AppError::Forbidden("Security token expired. Reload the page and try again.".to_string())
}

/// Rejects a submitted anti-forgery token that does not match the session's.
pub fn require_csrf(expected: &str, provided: &str) -> Result<(), AppError> {
    if super::csrf::verify(expected, provided) {
        Ok(())
    } else {
        tracing::warn!("Rejected request with invalid anti-forgery token");
        Err(AppError::Forbidden(
            "Security token is invalid. Reload the page and try again.".to_string(),
        ))
    }
}
