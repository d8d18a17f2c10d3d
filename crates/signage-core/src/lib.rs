//! Signage core library: the rules behind the control panel.
//!
//! `signage-core` holds everything that does not depend on HTTP: login
//! throttling, playlist ordering, display settings, upload validation and
//! the file store, and the SQLite persistence layer.
//!
//! # Modules
//!
//! - [`throttle`]: failed-login counting and lockout ([`LoginThrottle`]).
//! - [`playlist`]: dense 1..N ordering of [`VideoRecord`]s.
//! - [`settings`]: the single [`DisplaySettings`] record.
//! - [`media`]: upload allow-lists and the on-disk [`FileStore`].
//! - [`account`]: admin username/password rules.
//! - [`store`]: SQLite [`Database`] and repositories, legacy JSON import.
//! - [`error`]: unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod account;
pub mod error;
pub mod media;
pub mod playlist;
pub mod settings;
pub mod store;
pub mod throttle;

pub use account::AdminUser;
pub use error::{CoreError, CoreResult};
pub use media::{FileStore, MediaKind, MediaLimits, StagedUpload};
pub use playlist::{apply_explicit_order, next_order, reindex, VideoRecord};
pub use settings::DisplaySettings;
pub use store::Database;
pub use throttle::{AttemptStore, Decision, LoginAttemptRecord, LoginThrottle, ThrottlePolicy};
