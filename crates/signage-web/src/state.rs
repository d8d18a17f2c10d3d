use std::sync::Arc;

use signage_core::store::AttemptRepository;
use signage_core::{Database, DisplaySettings, FileStore, LoginThrottle};
use tokio::sync::Mutex;

use crate::auth::session::SessionStore;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db: Database,
    pub files: Arc<FileStore>,
    pub throttle: Arc<LoginThrottle<AttemptRepository>>,
    pub session_store: Arc<SessionStore>,
    /// Serializes load-modify-save sequences on the playlist.
    pub playlist_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: ServerConfig, db: Database) -> Self {
        let files = FileStore::new(config.storage.upload_dir.clone(), config.media_limits());
        let throttle = LoginThrottle::new(db.attempts(), config.throttle_policy());
        let session_store = SessionStore::new(config.auth.session_ttl_minutes * 60);

        Self {
            config: Arc::new(config),
            db,
            files: Arc::new(files),
            throttle: Arc::new(throttle),
            session_store: Arc::new(session_store),
            playlist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Settings defaults, with the configured ticker text.
    pub fn default_settings(&self) -> DisplaySettings {
        DisplaySettings::with_ticker(self.config.display.default_ticker_text.clone())
    }

    pub async fn load_settings(&self) -> signage_core::CoreResult<DisplaySettings> {
        self.db.settings().load(self.default_settings()).await
    }

    /// Public URL of the configured logo, if the file is actually present.
    pub async fn logo_url(&self, settings: &DisplaySettings) -> Option<String> {
        let name = settings.logo_filename.as_deref()?;
        if self.files.contains(name).await {
            Some(upload_url(name))
        } else {
            None
        }
    }
}

pub fn upload_url(stored_filename: &str) -> String {
    format!("/uploads/{stored_filename}")
}
