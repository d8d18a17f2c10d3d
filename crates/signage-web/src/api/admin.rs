use std::collections::HashMap;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use signage_core::account::{validate_new_password, validate_new_username};
use signage_core::playlist::{parse_order_payload, remove_video};
use signage_core::settings::normalize_ticker;
use signage_core::{apply_explicit_order, next_order, MediaKind, StagedUpload, VideoRecord};

use crate::auth::middleware::{require_csrf, AdminContext};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::session::removal_cookie;
use crate::dto::{ActionResponse, AdminOverview, AdminVideoDto, SettingsDto};
use crate::error::AppError;
use crate::state::AppState;

pub async fn overview(
    admin: AdminContext,
    State(state): State<AppState>,
) -> Result<Json<AdminOverview>, AppError> {
    let videos = state.db.videos().load().await?;
    let settings = state.load_settings().await?;
    let logo_url = state.logo_url(&settings).await;
    // The panel shows the primary account, which may differ from the
    // session identity when more than one admin row exists.
    let username = match state.db.admins().first().await? {
        Some(account) => account.username,
        None => admin.username,
    };

    Ok(Json(AdminOverview {
        username,
        csrf_token: admin.csrf_token,
        videos: videos.iter().map(AdminVideoDto::from).collect(),
        settings: SettingsDto::from(&settings),
        logo_url,
    }))
}

/// A file part of the admin form, already spooled to disk.
struct UploadedFile {
    staged: StagedUpload,
    original_name: String,
    content_type: String,
}

#[derive(Default)]
struct AdminForm {
    fields: HashMap<String, String>,
    video: Option<UploadedFile>,
    logo: Option<UploadedFile>,
}

impl AdminForm {
    fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    fn flag(&self, name: &str) -> bool {
        self.text(name) == "1"
    }
}

fn malformed(e: MultipartError) -> AppError {
    AppError::Validation(format!("Malformed form data: {}", e.body_text()))
}

async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<AdminForm, AppError> {
    let mut form = AdminForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        let kind = match name.as_str() {
            "video" => Some(MediaKind::Video),
            "logo" => Some(MediaKind::Logo),
            _ => None,
        };

        match (kind, field.file_name().map(str::to_string)) {
            (Some(kind), Some(original_name)) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let staged = spool(state, kind, field).await?;
                // Browsers send an empty part for a file input left blank.
                if original_name.is_empty() && staged.is_empty() {
                    continue;
                }
                let file = UploadedFile {
                    staged,
                    original_name,
                    content_type,
                };
                match kind {
                    MediaKind::Video => form.video = Some(file),
                    MediaKind::Logo => form.logo = Some(file),
                }
            }
            _ => {
                let value = field.text().await.map_err(malformed)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

async fn spool(
    state: &AppState,
    kind: MediaKind,
    mut field: Field<'_>,
) -> Result<StagedUpload, AppError> {
    let mut staged = state.files.stage(kind).await?;
    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        staged.write_chunk(&chunk).await?;
    }
    Ok(staged)
}

/// Dispatches one control-panel action.
pub async fn action(
    admin: AdminContext,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(&state, multipart).await?;
    require_csrf(&admin.csrf_token, form.text("csrf_token"))?;

    let action = form.text("action").to_string();
    tracing::debug!(action = %action, username = %admin.username, "Admin action");

    let notice = match action.as_str() {
        "upload" => upload_video(&state, form).await?,
        "delete" => delete_video(&state, &form).await?,
        "reorder" => reorder_videos(&state, &form).await?,
        "save_settings" => save_settings(&state, form).await?,
        "change_password" => change_password(&state, &admin, &form).await?,
        "change_username" => change_username(&state, &admin, &form).await?,
        "logout" => return Ok(logout(&state, &admin)),
        _ => return Err(AppError::Validation("Unknown action".to_string())),
    };

    Ok(Json(ActionResponse::notice(notice)).into_response())
}

async fn upload_video(state: &AppState, form: AdminForm) -> Result<String, AppError> {
    let file = form
        .video
        .ok_or_else(|| AppError::Validation("Choose a video file to upload".to_string()))?;

    let stored = state
        .files
        .commit(file.staged, &file.original_name, &file.content_type)
        .await?;

    let _guard = state.playlist_lock.lock().await;
    let saved = async {
        let mut videos = state.db.videos().load().await?;
        let order = next_order(&videos);
        videos.push(VideoRecord::uploaded_now(&file.original_name, &stored, order));
        state.db.videos().save(&videos).await
    }
    .await;

    if let Err(e) = saved {
        if let Err(cleanup) = state.files.remove(&stored).await {
            tracing::warn!(file = %stored, "Could not remove orphaned upload: {}", cleanup);
        }
        return Err(e.into());
    }

    tracing::info!(original = %file.original_name, stored = %stored, "Video added to playlist");
    Ok("Video uploaded".to_string())
}

async fn delete_video(state: &AppState, form: &AdminForm) -> Result<String, AppError> {
    let id = form.text("id").trim();

    let _guard = state.playlist_lock.lock().await;
    let videos = state.db.videos().load().await?;
    let (remaining, removed) = remove_video(videos, id)
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;
    state.db.videos().save(&remaining).await?;

    if let Err(e) = state.files.remove(&removed.stored_filename).await {
        tracing::warn!(file = %removed.stored_filename, "Could not remove video file: {}", e);
    }

    tracing::info!(id = %removed.id, original = %removed.original_name, "Video deleted");
    Ok("Video deleted".to_string())
}

async fn reorder_videos(state: &AppState, form: &AdminForm) -> Result<String, AppError> {
    let ids = parse_order_payload(form.text("order_payload"));
    if ids.is_empty() {
        return Err(AppError::Validation("Invalid playlist order".to_string()));
    }

    let _guard = state.playlist_lock.lock().await;
    let videos = state.db.videos().load().await?;
    let reordered = apply_explicit_order(videos, &ids);
    state.db.videos().save(&reordered).await?;

    tracing::info!(count = reordered.len(), "Playlist reordered");
    Ok("Playlist order saved".to_string())
}

async fn save_settings(state: &AppState, form: AdminForm) -> Result<String, AppError> {
    let mut settings = state.load_settings().await?;
    settings.ticker_text = normalize_ticker(form.text("ticker_text"));
    settings.video_muted = form.flag("video_muted");

    let mut obsolete = Vec::new();
    if form.flag("remove_logo") {
        obsolete.extend(settings.logo_filename.take());
    }

    let mut new_logo = None;
    if let Some(file) = form.logo {
        let stored = state
            .files
            .commit(file.staged, &file.original_name, &file.content_type)
            .await?;
        obsolete.extend(settings.logo_filename.replace(stored.clone()));
        new_logo = Some(stored);
    }

    if let Err(e) = state.db.settings().save(&settings).await {
        if let Some(stored) = new_logo {
            if let Err(cleanup) = state.files.remove(&stored).await {
                tracing::warn!(file = %stored, "Could not remove orphaned logo: {}", cleanup);
            }
        }
        return Err(e.into());
    }

    for name in obsolete {
        if let Err(e) = state.files.remove(&name).await {
            tracing::warn!(file = %name, "Could not remove old logo: {}", e);
        }
    }

    tracing::info!(
        muted = settings.video_muted,
        logo = ?settings.logo_filename,
        "Display settings saved"
    );
    Ok("Settings saved".to_string())
}

async fn change_password(
    state: &AppState,
    admin: &AdminContext,
    form: &AdminForm,
) -> Result<String, AppError> {
    let new_password = form.text("new_password");
    let confirm = form.text("confirm_password");
    if new_password != confirm {
        return Err(AppError::Validation(
            "New password confirmation does not match".to_string(),
        ));
    }

    let account = state
        .db
        .admins()
        .find_by_username(&admin.username)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin account not found".to_string()))?;

    let current = form.text("current_password").to_string();
    if !verify_password_blocking(account.password_hash, current).await? {
        return Err(AppError::Auth("Current password is incorrect".to_string()));
    }
    validate_new_password(new_password)?;

    let hash = hash_password_blocking(new_password.to_string()).await?;
    state.db.admins().update_password(account.id, &hash).await?;

    tracing::info!(username = %account.username, "Admin password changed");
    Ok("Password changed".to_string())
}

async fn change_username(
    state: &AppState,
    admin: &AdminContext,
    form: &AdminForm,
) -> Result<String, AppError> {
    let account = state
        .db
        .admins()
        .find_by_username(&admin.username)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin account not found".to_string()))?;

    let current = form.text("current_password_username").to_string();
    if !verify_password_blocking(account.password_hash.clone(), current).await? {
        return Err(AppError::Auth("Current password is incorrect".to_string()));
    }

    let new_username = validate_new_username(&account.username, form.text("new_username"))?;
    state.db.admins().rename(account.id, &new_username).await?;
    state.session_store.set_username(&admin.session_id, &new_username);

    tracing::info!(from = %account.username, to = %new_username, "Admin username changed");
    Ok(format!("Username changed to {new_username}"))
}

fn logout(state: &AppState, admin: &AdminContext) -> Response {
    state.session_store.remove(&admin.session_id);
    tracing::info!(username = %admin.username, "Admin logged out");
    (
        [(SET_COOKIE, removal_cookie())],
        Json(ActionResponse::notice("Logged out")),
    )
        .into_response()
}
