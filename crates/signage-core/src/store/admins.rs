//! Admin account persistence.

use sqlx::SqlitePool;

use crate::account::AdminUser;
use crate::error::{CoreError, CoreResult};

/// Repository for the `admin_users` table.
pub struct AdminRepository {
    pool: SqlitePool,
}

impl AdminRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The oldest admin account, shown as the panel's account.
    pub async fn first(&self) -> CoreResult<Option<AdminUser>> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, username, password_hash FROM admin_users ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_user))
    }

    /// Exact, case-sensitive username lookup.
    pub async fn find_by_username(&self, username: &str) -> CoreResult<Option<AdminUser>> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, username, password_hash FROM admin_users WHERE username = ? LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_user))
    }

    pub async fn insert(&self, username: &str, password_hash: &str) -> CoreResult<AdminUser> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO admin_users (username, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_to_validation(e, username))?;

        Ok(AdminUser {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE admin_users SET password_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("admin account {id}")));
        }
        Ok(())
    }

    /// Renames an account; a name already in use is a validation error.
    pub async fn rename(&self, id: i64, new_username: &str) -> CoreResult<()> {
        let result = sqlx::query("UPDATE admin_users SET username = ?, updated_at = ? WHERE id = ?")
            .bind(new_username)
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_to_validation(e, new_username))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("admin account {id}")));
        }
        Ok(())
    }

    pub async fn count(&self) -> CoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn into_user((id, username, password_hash): (i64, String, String)) -> AdminUser {
    AdminUser {
        id,
        username,
        password_hash,
    }
}

fn unique_to_validation(e: sqlx::Error, username: &str) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return CoreError::Validation(format!(
                "username {username} is already taken, choose another one"
            ));
        }
    }
    CoreError::from(e)
}
