//! One-time import of the JSON files used before the SQLite store.
//!
//! The directory may contain `videos.json`, `settings.json` and
//! `admin.json`. The first two are only applied while their table is still
//! empty. `admin.json` is only applied on the start that created the admin
//! table, so a password changed later through the panel survives restarts.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::playlist::{new_video_id, reindex, VideoRecord};
use crate::settings::{KEY_LOGO_FILENAME, KEY_TICKER_TEXT, KEY_VIDEO_MUTED};
use crate::store::Database;

/// What an import run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyImport {
    pub videos: usize,
    pub settings: usize,
    pub admin_password_updated: bool,
}

#[derive(Debug, Deserialize)]
struct LegacyVideo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    original_name: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    uploaded_at: Option<String>,
    #[serde(default)]
    order: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LegacyAdmin {
    username: String,
    password_hash: String,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> CoreResult<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::Io(e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CoreError::ConfigParse(format!("{}: {e}", path.display())))
}

fn parse_uploaded_at(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Settings values were written by a loosely typed tool; accept strings,
/// booleans and numbers alike.
fn setting_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Maps legacy rows to records, keeping the first row for each file name
/// and giving a fresh id to rows whose id is missing or already taken.
fn legacy_records(rows: Vec<LegacyVideo>) -> Vec<VideoRecord> {
    let mut filenames = HashSet::new();
    let mut ids = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.into_iter().enumerate() {
        if row.filename.is_empty() {
            continue;
        }
        if !filenames.insert(row.filename.clone()) {
            tracing::warn!(file = %row.filename, "Skipping duplicate legacy video entry");
            continue;
        }
        let id = match row.id.filter(|id| !id.is_empty()) {
            Some(id) if ids.insert(id.clone()) => id,
            Some(id) => {
                tracing::warn!(
                    id = %id,
                    file = %row.filename,
                    "Legacy video id already used; assigning a new one"
                );
                fresh_id(&mut ids)
            }
            None => fresh_id(&mut ids),
        };
        records.push(VideoRecord {
            id,
            original_name: row.original_name,
            stored_filename: row.filename,
            uploaded_at: parse_uploaded_at(row.uploaded_at.as_deref()),
            order: row.order.unwrap_or(i as i64 + 1),
        });
    }
    reindex(records)
}

fn fresh_id(taken: &mut HashSet<String>) -> String {
    loop {
        let id = new_video_id();
        if taken.insert(id.clone()) {
            return id;
        }
    }
}

/// Imports whatever legacy files exist in `dir`.
///
/// `apply_admin_file` should only be set when the admin table was empty
/// before this start seeded it.
pub async fn import_legacy(
    db: &Database,
    dir: &Path,
    apply_admin_file: bool,
) -> CoreResult<LegacyImport> {
    let mut summary = LegacyImport::default();

    if db.videos().count().await? == 0 {
        if let Some(rows) = read_json::<Vec<LegacyVideo>>(&dir.join("videos.json"))? {
            let records = legacy_records(rows);
            db.videos().save(&records).await?;
            summary.videos = records.len();
        }
    }

    if db.settings().count().await? == 0 {
        if let Some(map) =
            read_json::<serde_json::Map<String, Value>>(&dir.join("settings.json"))?
        {
            let rows: Vec<(&str, String)> = [KEY_TICKER_TEXT, KEY_LOGO_FILENAME, KEY_VIDEO_MUTED]
                .into_iter()
                .filter_map(|key| map.get(key).and_then(setting_value).map(|v| (key, v)))
                .collect();
            db.settings().put_all(&rows).await?;
            summary.settings = rows.len();
        }
    }

    let admin_file = dir.join("admin.json");
    if !apply_admin_file {
        if admin_file.exists() {
            tracing::debug!(
                file = %admin_file.display(),
                "Admin accounts already existed; legacy admin file ignored"
            );
        }
    } else if let Some(admin) = read_json::<LegacyAdmin>(&admin_file)? {
        let admins = db.admins();
        if let Some(existing) = admins.find_by_username(&admin.username).await? {
            admins
                .update_password(existing.id, &admin.password_hash)
                .await?;
            summary.admin_password_updated = true;
        }
    }

    if summary != LegacyImport::default() {
        tracing::info!(
            videos = summary.videos,
            settings = summary.settings,
            admin_password_updated = summary.admin_password_updated,
            dir = %dir.display(),
            "Imported legacy data"
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DisplaySettings;
    use tempfile::TempDir;

    #[tokio::test]
    async fn imports_videos_and_settings_into_empty_store() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("videos.json"),
            r#"[
                {"id": "b1", "original_name": "B.mp4", "filename": "b.mp4",
                 "uploaded_at": "2024-02-01T10:00:00+07:00", "order": 7},
                {"id": "a1", "original_name": "A.mp4", "filename": "a.mp4",
                 "uploaded_at": "2024-01-01T10:00:00+07:00", "order": 2}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"ticker_text": "Old ticker", "video_muted": 0, "theme": "x"}"#,
        )
        .unwrap();

        let db = Database::new(":memory:").await.unwrap();
        let summary = import_legacy(&db, dir.path(), true).await.unwrap();
        assert_eq!(summary.videos, 2);
        assert_eq!(summary.settings, 2);

        let videos = db.videos().load().await.unwrap();
        let seq: Vec<(&str, i64)> = videos.iter().map(|v| (v.id.as_str(), v.order)).collect();
        assert_eq!(seq, vec![("a1", 1), ("b1", 2)]);

        let settings = db.settings().load(DisplaySettings::default()).await.unwrap();
        assert_eq!(settings.ticker_text, "Old ticker");
        assert!(!settings.video_muted);
    }

    #[tokio::test]
    async fn does_not_touch_populated_tables() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"ticker_text": "Old ticker"}"#,
        )
        .unwrap();

        let db = Database::new(":memory:").await.unwrap();
        db.settings().put("ticker_text", "Current").await.unwrap();

        let summary = import_legacy(&db, dir.path(), true).await.unwrap();
        assert_eq!(summary.settings, 0);
    }

    #[tokio::test]
    async fn admin_file_updates_existing_account_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("admin.json"),
            r#"{"username": "admin", "password_hash": "$legacy"}"#,
        )
        .unwrap();

        let db = Database::new(":memory:").await.unwrap();
        let first = import_legacy(&db, dir.path(), true).await.unwrap();
        assert!(!first.admin_password_updated);

        db.admins().insert("admin", "$current").await.unwrap();
        let second = import_legacy(&db, dir.path(), true).await.unwrap();
        assert!(second.admin_password_updated);
        assert_eq!(
            db.admins().first().await.unwrap().unwrap().password_hash,
            "$legacy"
        );
    }

    #[tokio::test]
    async fn changed_password_survives_a_later_import() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("admin.json"),
            r#"{"username": "admin", "password_hash": "$legacy"}"#,
        )
        .unwrap();

        let db = Database::new(":memory:").await.unwrap();
        let admin = db.admins().insert("admin", "$seeded").await.unwrap();
        let first = import_legacy(&db, dir.path(), true).await.unwrap();
        assert!(first.admin_password_updated);

        db.admins().update_password(admin.id, "$changed").await.unwrap();
        let second = import_legacy(&db, dir.path(), false).await.unwrap();
        assert!(!second.admin_password_updated);
        assert_eq!(
            db.admins().first().await.unwrap().unwrap().password_hash,
            "$changed"
        );
    }

    #[tokio::test]
    async fn duplicate_legacy_videos_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("videos.json"),
            r#"[
                {"id": "a1", "original_name": "A.mp4", "filename": "a.mp4", "order": 1},
                {"id": "a2", "original_name": "A copy.mp4", "filename": "a.mp4", "order": 2},
                {"id": "a1", "original_name": "B.mp4", "filename": "b.mp4", "order": 3}
            ]"#,
        )
        .unwrap();

        let db = Database::new(":memory:").await.unwrap();
        let summary = import_legacy(&db, dir.path(), true).await.unwrap();
        assert_eq!(summary.videos, 2);

        let videos = db.videos().load().await.unwrap();
        let names: Vec<&str> = videos.iter().map(|v| v.original_name.as_str()).collect();
        assert_eq!(names, vec!["A.mp4", "B.mp4"]);
        assert_eq!(videos[0].id, "a1");
        assert_ne!(videos[1].id, "a1");
    }

    #[tokio::test]
    async fn missing_directory_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(":memory:").await.unwrap();
        let summary = import_legacy(&db, &dir.path().join("absent"), true).await.unwrap();
        assert_eq!(summary, LegacyImport::default());
    }

    #[tokio::test]
    async fn malformed_json_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("videos.json"), "{not json").unwrap();
        let db = Database::new(":memory:").await.unwrap();
        let err = import_legacy(&db, dir.path(), true).await.unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }
}
