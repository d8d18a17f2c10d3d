mod admin;
mod auth_handlers;
mod display;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(auth_handlers::login))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/display", get(display::display_feed))
        .route("/session", get(auth_handlers::session_info))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/admin", get(admin::overview).post(admin::action))
}
