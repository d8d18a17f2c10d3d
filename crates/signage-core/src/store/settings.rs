//! Display settings persistence (key/value rows).

use sqlx::SqlitePool;

use crate::error::CoreResult;
use crate::settings::{DisplaySettings, KEY_VIDEO_MUTED};

/// Repository for the `settings` table.
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads the stored settings on top of `defaults`.
    pub async fn load(&self, defaults: DisplaySettings) -> CoreResult<DisplaySettings> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT setting_key, setting_value FROM settings",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(DisplaySettings::from_pairs(defaults, rows))
    }

    /// Upserts every key in one transaction.
    pub async fn save(&self, settings: &DisplaySettings) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings.to_pairs() {
            upsert(&mut tx, key, &value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> CoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Writes `defaults` when the table is empty; otherwise only makes sure
    /// the mute flag has a row.
    pub async fn seed_defaults(&self, defaults: &DisplaySettings) -> CoreResult<()> {
        if self.count().await? == 0 {
            tracing::info!("Seeding default display settings");
            return self.save(defaults).await;
        }

        sqlx::query(
            "INSERT OR IGNORE INTO settings (setting_key, setting_value) VALUES (?, ?)",
        )
        .bind(KEY_VIDEO_MUTED)
        .bind(if defaults.video_muted { "1" } else { "0" })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upserts a single raw key/value row.
    pub async fn put(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert(&mut tx, key, value).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Upserts several raw rows in one transaction; either all land or none.
    pub async fn put_all(&self, rows: &[(&str, String)]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in rows {
            upsert(&mut tx, key, value).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    key: &str,
    value: &str,
) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (setting_key, setting_value)
        VALUES (?, ?)
        ON CONFLICT(setting_key) DO UPDATE SET setting_value = excluded.setting_value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::settings::DisplaySettings;
    use crate::store::Database;

    #[tokio::test]
    async fn empty_table_loads_defaults() {
        let db = Database::new(":memory:").await.unwrap();
        let loaded = db
            .settings()
            .load(DisplaySettings::with_ticker("Hello"))
            .await
            .unwrap();
        assert_eq!(loaded, DisplaySettings::with_ticker("Hello"));
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.settings();

        let mut s = DisplaySettings::default();
        s.ticker_text = "First".into();
        repo.save(&s).await.unwrap();

        s.ticker_text = "Second".into();
        s.video_muted = false;
        s.logo_filename = Some("logo_1.png".into());
        repo.save(&s).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.load(DisplaySettings::default()).await.unwrap(), s);
    }

    #[tokio::test]
    async fn put_all_writes_every_row() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.settings();

        repo.put_all(&[]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.put_all(&[
            ("ticker_text", "Imported".to_string()),
            ("video_muted", "0".to_string()),
        ])
        .await
        .unwrap();

        let loaded = repo.load(DisplaySettings::default()).await.unwrap();
        assert_eq!(loaded.ticker_text, "Imported");
        assert!(!loaded.video_muted);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn seed_only_fills_empty_table() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.settings();

        repo.put("ticker_text", "Custom").await.unwrap();
        repo.seed_defaults(&DisplaySettings::with_ticker("Default"))
            .await
            .unwrap();

        let loaded = repo.load(DisplaySettings::with_ticker("Default")).await.unwrap();
        assert_eq!(loaded.ticker_text, "Custom");
        assert!(loaded.video_muted);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
