use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use signage_core::{MediaLimits, ThrottlePolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Directory with `videos.json` / `settings.json` / `admin.json` from
    /// the file-based version, imported on startup.
    #[serde(default)]
    pub legacy_data_dir: Option<PathBuf>,
    #[serde(default = "default_max_video_size_mb")]
    pub max_video_size_mb: u64,
    #[serde(default = "default_max_logo_size_mb")]
    pub max_logo_size_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_initial_username")]
    pub initial_username: String,
    /// Argon2 hash for the seeded admin. When empty the default password is used.
    #[serde(default)]
    pub initial_password_hash: String,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: i64,
    #[serde(default = "default_lockout_seconds")]
    pub lockout_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_login_rpm")]
    pub login_requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_ticker_text")]
    pub default_ticker_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

/// Password of the seeded admin when no hash is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_database() -> String { "data/signage.db".to_string() }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_max_video_size_mb() -> u64 { 300 }
fn default_max_logo_size_mb() -> u64 { 5 }
fn default_initial_username() -> String { "admin".to_string() }
fn default_session_ttl_minutes() -> u64 { 480 }
fn default_max_attempts() -> u32 { 5 }
fn default_window_seconds() -> i64 { 300 }
fn default_lockout_seconds() -> i64 { 600 }
fn default_login_rpm() -> u32 { 10 }
fn default_ticker_text() -> String { signage_core::settings::DEFAULT_TICKER_TEXT.to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            upload_dir: default_upload_dir(),
            legacy_data_dir: None,
            max_video_size_mb: default_max_video_size_mb(),
            max_logo_size_mb: default_max_logo_size_mb(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            initial_username: default_initial_username(),
            initial_password_hash: String::new(),
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_seconds: default_window_seconds(),
            lockout_seconds: default_lockout_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { login_requests_per_minute: default_login_rpm() }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { default_ticker_text: default_ticker_text() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            throttle: ThrottleConfig::default(),
            rate_limit: RateLimitConfig::default(),
            display: DisplayConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            max_attempts: self.throttle.max_attempts,
            window_seconds: self.throttle.window_seconds,
            lockout_seconds: self.throttle.lockout_seconds,
        }
    }

    pub fn media_limits(&self) -> MediaLimits {
        MediaLimits::from_megabytes(self.storage.max_video_size_mb, self.storage.max_logo_size_mb)
    }

    /// Largest request body accepted: one video upload plus form overhead.
    pub fn max_body_bytes(&self) -> usize {
        let video = self.storage.max_video_size_mb.max(self.storage.max_logo_size_mb);
        (video as usize + 1) * 1024 * 1024
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("SIGNAGE_CONFIG").map(PathBuf::from).ok();

        let config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(&path)?;
            Self::from_toml(&contents)?
        } else {
            ServerConfig::default()
        };

        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(mut self) -> anyhow::Result<Self> {
        if let Ok(addr) = std::env::var("SIGNAGE_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }
        if let Ok(db) = std::env::var("SIGNAGE_DATABASE") {
            self.storage.database = db;
        }
        if let Ok(dir) = std::env::var("SIGNAGE_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SIGNAGE_LEGACY_DATA_DIR") {
            self.storage.legacy_data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(val) = std::env::var("SIGNAGE_MAX_VIDEO_SIZE_MB") {
            if let Ok(mb) = val.parse::<u64>() {
                self.storage.max_video_size_mb = mb;
            }
        }
        if let Ok(hash) = std::env::var("SIGNAGE_INITIAL_PASSWORD_HASH") {
            self.auth.initial_password_hash = hash;
        }
        if let Ok(cert) = std::env::var("SIGNAGE_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Ok(key) = std::env::var("SIGNAGE_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.throttle.max_attempts == 0 {
            anyhow::bail!("throttle.max_attempts must be at least 1");
        }
        if self.throttle.window_seconds <= 0 || self.throttle.lockout_seconds <= 0 {
            anyhow::bail!("throttle.window_seconds and throttle.lockout_seconds must be positive");
        }
        if self.storage.max_video_size_mb == 0 || self.storage.max_logo_size_mb == 0 {
            anyhow::bail!("upload size limits must be positive");
        }
        if self.auth.session_ttl_minutes == 0 {
            anyhow::bail!("auth.session_ttl_minutes must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.storage.max_video_size_mb, 300);
        assert_eq!(config.storage.max_logo_size_mb, 5);
        assert_eq!(config.throttle_policy(), ThrottlePolicy::default());
        assert_eq!(config.auth.initial_username, "admin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            bind_addr = "127.0.0.1:9000"

            [storage]
            upload_dir = "/srv/signage/uploads"
            max_video_size_mb = 50

            [throttle]
            max_attempts = 3
            lockout_seconds = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.storage.upload_dir, PathBuf::from("/srv/signage/uploads"));
        assert_eq!(config.media_limits().max_video_bytes, 50 * 1024 * 1024);
        let policy = config.throttle_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.window_seconds, 300);
        assert_eq!(policy.lockout_seconds, 60);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = ServerConfig::from_toml("[throttle]\nmax_attempts = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn body_limit_covers_largest_upload() {
        let config = ServerConfig::default();
        assert!(config.max_body_bytes() > 300 * 1024 * 1024);
    }
}
