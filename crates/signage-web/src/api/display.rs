use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::dto::{DisplayResponse, DisplayVideoDto};
use crate::error::AppError;
use crate::state::AppState;

/// Public playlist feed polled by the display page.
pub async fn display_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let videos = state.db.videos().load().await?;
    let settings = state.load_settings().await?;
    let logo_url = state.logo_url(&settings).await;

    let body = DisplayResponse {
        videos: videos.iter().map(DisplayVideoDto::from).collect(),
        ticker_text: settings.ticker_text,
        video_muted: settings.video_muted,
        logo_url,
    };

    Ok((
        [
            (CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        Json(body),
    )
        .into_response())
}
