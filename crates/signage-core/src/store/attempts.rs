//! Login throttle records.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::CoreResult;
use crate::throttle::{AttemptStore, LoginAttemptRecord};

type AttemptRow = (String, String, String, i64, i64, i64, i64);

/// Repository for the `login_attempts` table.
#[derive(Clone)]
pub struct AttemptRepository {
    pool: SqlitePool,
}

impl AttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Drops records with no open window and no running lockout that have
    /// not been touched since `before`.
    pub async fn purge_stale(&self, before: i64, now: i64) -> CoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM login_attempts WHERE updated_at < ? AND blocked_until <= ?",
        )
        .bind(before)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AttemptStore for AttemptRepository {
    async fn find(&self, key: &str) -> CoreResult<Option<LoginAttemptRecord>> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT attempt_key, username, ip_address, attempts,
                   first_failed_at, blocked_until, updated_at
            FROM login_attempts
            WHERE attempt_key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(key, username, address, attempts, first_failed_at, blocked_until, updated_at)| {
                LoginAttemptRecord {
                    key,
                    username,
                    address,
                    attempts: attempts.max(0) as u32,
                    first_failed_at,
                    blocked_until,
                    updated_at,
                }
            },
        ))
    }

    async fn upsert(&self, record: &LoginAttemptRecord) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts
                (attempt_key, username, ip_address, attempts, first_failed_at, blocked_until, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(attempt_key) DO UPDATE SET
                username = excluded.username,
                ip_address = excluded.ip_address,
                attempts = excluded.attempts,
                first_failed_at = excluded.first_failed_at,
                blocked_until = excluded.blocked_until,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.key)
        .bind(&record.username)
        .bind(&record.address)
        .bind(i64::from(record.attempts))
        .bind(record.first_failed_at)
        .bind(record.blocked_until)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM login_attempts WHERE attempt_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
