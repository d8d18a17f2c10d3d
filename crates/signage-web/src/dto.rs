use serde::{Deserialize, Serialize};
use signage_core::{DisplaySettings, VideoRecord};

use crate::state::upload_url;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub csrf_token: String,
    pub logged_in: bool,
    pub username: Option<String>,
}

/// A playlist entry as the display page plays it.
#[derive(Debug, Serialize)]
pub struct DisplayVideoDto {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl From<&VideoRecord> for DisplayVideoDto {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.original_name.clone(),
            url: upload_url(&record.stored_filename),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DisplayResponse {
    pub videos: Vec<DisplayVideoDto>,
    pub ticker_text: String,
    pub video_muted: bool,
    pub logo_url: Option<String>,
}

/// A playlist entry as the control panel lists it.
#[derive(Debug, Serialize)]
pub struct AdminVideoDto {
    pub id: String,
    pub original_name: String,
    pub stored_filename: String,
    pub url: String,
    pub uploaded_at: String,
    pub order: i64,
}

impl From<&VideoRecord> for AdminVideoDto {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.clone(),
            original_name: record.original_name.clone(),
            stored_filename: record.stored_filename.clone(),
            url: upload_url(&record.stored_filename),
            uploaded_at: record.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            order: record.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsDto {
    pub ticker_text: String,
    pub video_muted: bool,
    pub logo_filename: Option<String>,
}

impl From<&DisplaySettings> for SettingsDto {
    fn from(settings: &DisplaySettings) -> Self {
        Self {
            ticker_text: settings.ticker_text.clone(),
            video_muted: settings.video_muted,
            logo_filename: settings.logo_filename.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    pub username: String,
    pub csrf_token: String,
    pub videos: Vec<AdminVideoDto>,
    pub settings: SettingsDto,
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub notice: String,
}

impl ActionResponse {
    pub fn notice(notice: impl Into<String>) -> Self {
        Self {
            success: true,
            notice: notice.into(),
        }
    }
}
