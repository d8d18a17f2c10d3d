//! Uploaded media: validation rules and the on-disk file store.
//!
//! Uploads are streamed into a temporary `.part` file ([`StagedUpload`]) and
//! only renamed to their final, server-generated name by
//! [`FileStore::commit`] once they pass validation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::error::{CoreError, CoreResult};

/// Bytes of each upload kept for content sniffing.
const HEAD_LEN: usize = 32;

const MIB: u64 = 1024 * 1024;

/// What an upload is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Logo,
}

impl MediaKind {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => &["mp4", "webm", "ogg", "mov", "m4v"],
            MediaKind::Logo => &["png", "jpg", "jpeg", "webp"],
        }
    }

    pub fn content_types(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => &[
                "video/mp4",
                "video/webm",
                "video/ogg",
                "video/quicktime",
                "application/octet-stream",
            ],
            MediaKind::Logo => &[
                "image/png",
                "image/jpeg",
                "image/webp",
                "application/octet-stream",
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Logo => "logo",
        }
    }

    /// Both the extension and the content type must be on the allow-list.
    pub fn is_allowed(&self, content_type: &str, extension: &str) -> bool {
        let content_type = content_type.trim().to_lowercase();
        let extension = extension.trim().to_lowercase();
        self.extensions().contains(&extension.as_str())
            && self.content_types().contains(&content_type.as_str())
    }
}

/// Size ceilings per media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub max_video_bytes: u64,
    pub max_logo_bytes: u64,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_video_bytes: 300 * MIB,
            max_logo_bytes: 5 * MIB,
        }
    }
}

impl MediaLimits {
    pub fn from_megabytes(video_mb: u64, logo_mb: u64) -> Self {
        Self {
            max_video_bytes: video_mb * MIB,
            max_logo_bytes: logo_mb * MIB,
        }
    }

    pub fn for_kind(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Video => self.max_video_bytes,
            MediaKind::Logo => self.max_logo_bytes,
        }
    }
}

/// Lowercased extension of a user-supplied filename, or `""`.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Server-side name for a stored upload.
///
/// Videos: `YYYYmmdd_HHMMSS_<8 hex>.<ext>`; logos:
/// `logo_YYYYmmdd_HHMMSS_<6 hex>.<ext>`.
pub fn stored_name(kind: MediaKind, extension: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let mut rng = rand::thread_rng();
    match kind {
        MediaKind::Video => format!("{stamp}_{:08x}.{extension}", rng.gen::<u32>()),
        MediaKind::Logo => format!(
            "logo_{stamp}_{:06x}.{extension}",
            rng.gen::<u32>() & 0x00ff_ffff
        ),
    }
}

/// MIME type of a PNG, JPEG or WebP image recognised from its first bytes.
pub fn sniff_image(head: &[u8]) -> Option<&'static str> {
    use image::ImageFormat;

    match image::guess_format(head).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Rejects names that could escape the upload directory.
fn check_stored_name(name: &str) -> CoreResult<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(CoreError::Validation(format!("invalid file name: {name}")));
    }
    Ok(())
}

/// An upload being written to a temporary file.
///
/// Dropping it without [`FileStore::commit`] removes the temporary file.
#[derive(Debug)]
pub struct StagedUpload {
    kind: MediaKind,
    path: PathBuf,
    file: Option<tokio::fs::File>,
    size: u64,
    limit: u64,
    head: Vec<u8>,
    committed: bool,
}

impl StagedUpload {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends a chunk, failing with a validation error once the size limit
    /// for this kind is exceeded.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> CoreResult<()> {
        self.size += chunk.len() as u64;
        if self.size > self.limit {
            return Err(CoreError::Validation(format!(
                "{} is too large (maximum {} MB)",
                self.kind.label(),
                self.limit / MIB
            )));
        }

        if self.head.len() < HEAD_LEN {
            let take = (HEAD_LEN - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CoreError::Validation("upload already finished".to_string()))?;
        file.write_all(chunk).await?;
        Ok(())
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Flat directory holding uploaded videos and logos.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    limits: MediaLimits,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, limits: MediaLimits) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    /// Creates the upload directory if it does not exist yet.
    pub async fn ensure_root(&self) -> CoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Absolute path of a stored file.
    pub fn path_of(&self, name: &str) -> CoreResult<PathBuf> {
        check_stored_name(name)?;
        Ok(self.root.join(name))
    }

    pub async fn contains(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Opens a temporary file for an incoming upload of `kind`.
    pub async fn stage(&self, kind: MediaKind) -> CoreResult<StagedUpload> {
        let tmp_name = format!(".upload-{:016x}.part", rand::thread_rng().gen::<u64>());
        let path = self.root.join(tmp_name);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok(StagedUpload {
            kind,
            path,
            file: Some(file),
            size: 0,
            limit: self.limits.for_kind(kind),
            head: Vec::with_capacity(HEAD_LEN),
            committed: false,
        })
    }

    /// Validates a finished upload and moves it to a fresh unique name.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] if the upload is empty, or its extension,
    ///   content type or (for logos) image signature is not allowed.
    /// - [`CoreError::Io`] if the file cannot be flushed or renamed.
    pub async fn commit(
        &self,
        mut staged: StagedUpload,
        original_name: &str,
        content_type: &str,
    ) -> CoreResult<String> {
        if staged.is_empty() {
            return Err(CoreError::Validation(format!(
                "no {} file was uploaded",
                staged.kind.label()
            )));
        }

        let extension = extension_of(original_name);
        if !staged.kind.is_allowed(content_type, &extension) {
            return Err(CoreError::Validation(format!(
                "unsupported {} format, use {}",
                staged.kind.label(),
                staged.kind.extensions().join("/")
            )));
        }

        if staged.kind == MediaKind::Logo && sniff_image(&staged.head).is_none() {
            return Err(CoreError::Validation(
                "logo file is not a PNG, JPEG or WebP image".to_string(),
            ));
        }

        if let Some(mut file) = staged.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        let mut name = stored_name(staged.kind, &extension, Utc::now());
        while tokio::fs::try_exists(self.root.join(&name)).await? {
            name = stored_name(staged.kind, &extension, Utc::now());
        }

        tokio::fs::rename(&staged.path, self.root.join(&name)).await?;
        staged.committed = true;

        tracing::info!(
            kind = staged.kind.label(),
            original = %original_name,
            stored = %name,
            bytes = staged.size,
            "Upload stored"
        );
        Ok(name)
    }

    /// Deletes a stored file. A file that is already gone counts as removed.
    pub async fn remove(&self, name: &str) -> CoreResult<()> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %name, "File already absent");
                Ok(())
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }
}
