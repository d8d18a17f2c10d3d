use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use signage_core::account::constant_time_eq;

use crate::auth::middleware::{require_csrf, SessionContext};
use crate::auth::password::verify_password_blocking;
use crate::auth::session::{session_cookie, session_id_from_headers};
use crate::dto::{LoginForm, LoginResponse, SessionResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Returns the visitor's session, starting one (and setting the cookie) if
/// the request carries none.
pub async fn session_info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = session_id_from_headers(&headers)
        .and_then(|id| state.session_store.get(&id).map(|s| (id, s)));

    let (session_id, session, is_new) = match existing {
        Some((id, session)) => (id, session, false),
        None => {
            let (id, session) = state.session_store.create();
            (id, session, true)
        }
    };

    let body = Json(SessionResponse {
        logged_in: session.is_logged_in(),
        username: session.admin_username,
        csrf_token: session.csrf_token,
    });

    if is_new {
        let cookie = session_cookie(&session_id, state.config.tls.is_enabled());
        ([(SET_COOKIE, cookie)], body).into_response()
    } else {
        body.into_response()
    }
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ctx: SessionContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    require_csrf(&ctx.session.csrf_token, &form.csrf_token)?;

    let username = form.username.trim().to_string();
    let address = peer.ip().to_string();

    let decision = state.throttle.check_allowed(&username, &address).await?;
    if !decision.is_allowed() {
        tracing::warn!(
            username = %username,
            address = %address,
            "Login refused while locked out"
        );
        return Err(AppError::Throttled(decision.seconds_remaining()));
    }

    if username.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "Enter both username and password".to_string(),
        ));
    }

    if !credentials_match(&state, &username, &form.password).await? {
        tracing::warn!(username = %username, address = %address, "Failed login attempt");
        let after = state.throttle.register_failure(&username, &address).await?;
        if !after.is_allowed() {
            return Err(AppError::Throttled(after.seconds_remaining()));
        }
        return Err(AppError::Auth("Invalid username or password".to_string()));
    }

    state.throttle.clear_failures(&username, &address).await?;
    let (session_id, session) = state.session_store.login(&ctx.session_id, &username);
    tracing::info!(username = %username, address = %address, "Admin logged in");

    let cookie = session_cookie(&session_id, state.config.tls.is_enabled());
    let body = Json(LoginResponse {
        success: true,
        username,
        csrf_token: session.csrf_token,
    });
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

async fn credentials_match(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<bool, AppError> {
    let Some(admin) = state.db.admins().find_by_username(username).await? else {
        return Ok(false);
    };
    if !constant_time_eq(admin.username.as_bytes(), username.as_bytes()) {
        return Ok(false);
    }
    let valid = verify_password_blocking(admin.password_hash, password.to_string()).await?;
    Ok(valid)
}
