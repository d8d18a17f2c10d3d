//! First-start preparation of the store: upload directory, admin account,
//! legacy JSON import and default display settings.

use signage_core::store::legacy::import_legacy;
use signage_core::{Database, DisplaySettings, FileStore};

use crate::auth::password::hash_password_blocking;
use crate::config::{ServerConfig, DEFAULT_ADMIN_PASSWORD};

pub async fn prepare_storage(
    config: &ServerConfig,
    db: &Database,
    files: &FileStore,
) -> anyhow::Result<()> {
    files.ensure_root().await?;
    let fresh_admin_table = db.admins().count().await? == 0;
    seed_admin(config, db).await?;

    if let Some(dir) = &config.storage.legacy_data_dir {
        import_legacy(db, dir, fresh_admin_table).await?;
    }

    let defaults = DisplaySettings::with_ticker(config.display.default_ticker_text.clone());
    db.settings().seed_defaults(&defaults).await?;
    Ok(())
}

/// Creates the initial admin when no account exists yet.
async fn seed_admin(config: &ServerConfig, db: &Database) -> anyhow::Result<()> {
    if db.admins().count().await? > 0 {
        return Ok(());
    }

    let username = config.auth.initial_username.trim();
    let hash = if config.auth.initial_password_hash.is_empty() {
        tracing::warn!(
            "No initial password hash configured; admin '{}' uses the default password. Change it after logging in.",
            username
        );
        hash_password_blocking(DEFAULT_ADMIN_PASSWORD.to_string()).await?
    } else {
        config.auth.initial_password_hash.clone()
    };

    db.admins().insert(username, &hash).await?;
    tracing::info!("Created admin account '{}'", username);
    Ok(())
}
