use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

/// Display, login and control-panel pages compiled into the binary.
#[derive(Embed)]
#[folder = "web/dist/"]
struct Pages;

const DISPLAY_PAGE: &str = "index.html";

fn resolve(path: &str) -> String {
    match path {
        "" => DISPLAY_PAGE.to_string(),
        "admin" | "login" => format!("{path}.html"),
        other => other.to_string(),
    }
}

pub async fn static_handler(uri: Uri) -> Response {
    let requested = resolve(uri.path().trim_start_matches('/'));

    let (name, file) = match Pages::get(&requested) {
        Some(file) => (requested, file),
        None => match Pages::get(DISPLAY_PAGE) {
            Some(file) => (DISPLAY_PAGE.to_string(), file),
            None => return StatusCode::NOT_FOUND.into_response(),
        },
    };

    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        file.data.into_owned(),
    )
        .into_response()
}
