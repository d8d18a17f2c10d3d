//! Playlist persistence.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::CoreResult;
use crate::playlist::VideoRecord;

type VideoRow = (String, String, String, DateTime<Utc>, i64);

/// Repository for the `videos` table.
pub struct VideoRepository {
    pool: SqlitePool,
}

impl VideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All videos in playback order (ties broken by upload time).
    pub async fn load(&self) -> CoreResult<Vec<VideoRecord>> {
        let rows = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT id, original_name, filename, uploaded_at, sort_order
            FROM videos
            ORDER BY sort_order ASC, uploaded_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, original_name, stored_filename, uploaded_at, order)| VideoRecord {
                    id,
                    original_name,
                    stored_filename,
                    uploaded_at,
                    order,
                },
            )
            .collect())
    }

    /// Makes the table match `videos` exactly.
    ///
    /// Every given record is upserted and rows whose id is absent are
    /// deleted, all in one transaction: on error nothing is applied.
    pub async fn save(&self, videos: &[VideoRecord]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<String> = sqlx::query_scalar("SELECT id FROM videos")
            .fetch_all(&mut *tx)
            .await?;

        for video in videos {
            sqlx::query(
                r#"
                INSERT INTO videos (id, original_name, filename, uploaded_at, sort_order)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    original_name = excluded.original_name,
                    filename = excluded.filename,
                    uploaded_at = excluded.uploaded_at,
                    sort_order = excluded.sort_order
                "#,
            )
            .bind(&video.id)
            .bind(&video.original_name)
            .bind(&video.stored_filename)
            .bind(video.uploaded_at)
            .bind(video.order)
            .execute(&mut *tx)
            .await?;
        }

        let keep: HashSet<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        let mut removed = 0u64;
        for id in existing.iter().filter(|id| !keep.contains(id.as_str())) {
            removed += sqlx::query("DELETE FROM videos WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        tracing::debug!(count = videos.len(), removed, "Playlist saved");
        Ok(())
    }

    pub async fn count(&self) -> CoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::playlist::{apply_explicit_order, new_video_id, next_order, remove_video};
    use crate::playlist::VideoRecord;
    use crate::store::Database;
    use chrono::{Duration, TimeZone, Utc};

    fn upload(records: &mut Vec<VideoRecord>, name: &str, minute: i64) -> String {
        let id = new_video_id();
        let order = next_order(records);
        records.push(VideoRecord {
            id: id.clone(),
            original_name: name.to_string(),
            stored_filename: format!("{id}.mp4"),
            uploaded_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
            order,
        });
        id
    }

    #[tokio::test]
    async fn save_then_load_roundtrip_keeps_order() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.videos();

        let mut videos = Vec::new();
        upload(&mut videos, "a.mp4", 0);
        upload(&mut videos, "b.mp4", 1);
        repo.save(&videos).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded, videos);
    }

    #[tokio::test]
    async fn save_deletes_rows_missing_from_collection() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.videos();

        let mut videos = Vec::new();
        upload(&mut videos, "a.mp4", 0);
        let b = upload(&mut videos, "b.mp4", 1);
        repo.save(&videos).await.unwrap();

        let (rest, _) = remove_video(videos, &b).unwrap();
        repo.save(&rest).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.save(&[]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_save_leaves_previous_state() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.videos();

        let mut videos = Vec::new();
        upload(&mut videos, "a.mp4", 0);
        upload(&mut videos, "b.mp4", 1);
        repo.save(&videos).await.unwrap();

        // Two records sharing a stored filename violate the UNIQUE constraint.
        let mut broken = videos.clone();
        broken[0].order = 2;
        broken[1].order = 1;
        broken[1].stored_filename = broken[0].stored_filename.clone();
        assert!(repo.save(&broken).await.is_err());

        assert_eq!(repo.load().await.unwrap(), videos);
    }

    #[tokio::test]
    async fn upload_delete_reorder_flow() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.videos();

        let mut videos = repo.load().await.unwrap();
        let a = upload(&mut videos, "a.mp4", 0);
        repo.save(&videos).await.unwrap();
        let mut videos = repo.load().await.unwrap();
        let b = upload(&mut videos, "b.mp4", 1);
        repo.save(&videos).await.unwrap();
        let mut videos = repo.load().await.unwrap();
        let c = upload(&mut videos, "c.mp4", 2);
        repo.save(&videos).await.unwrap();

        let loaded = repo.load().await.unwrap();
        let seq: Vec<(&str, i64)> = loaded.iter().map(|v| (v.id.as_str(), v.order)).collect();
        assert_eq!(seq, vec![(a.as_str(), 1), (b.as_str(), 2), (c.as_str(), 3)]);

        let (rest, removed) = remove_video(loaded, &b).unwrap();
        assert_eq!(removed.id, b);
        repo.save(&rest).await.unwrap();
        let loaded = repo.load().await.unwrap();
        let seq: Vec<(&str, i64)> = loaded.iter().map(|v| (v.id.as_str(), v.order)).collect();
        assert_eq!(seq, vec![(a.as_str(), 1), (c.as_str(), 2)]);

        let reordered = apply_explicit_order(loaded, &[c.clone(), a.clone()]);
        repo.save(&reordered).await.unwrap();
        let loaded = repo.load().await.unwrap();
        let seq: Vec<(&str, i64)> = loaded.iter().map(|v| (v.id.as_str(), v.order)).collect();
        assert_eq!(seq, vec![(c.as_str(), 1), (a.as_str(), 2)]);
    }
}
