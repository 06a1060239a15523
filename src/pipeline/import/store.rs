//! Receipt file storage.
//!
//! Validated uploads are stored under a UUID-based name (originals may
//! collide or carry hostile names) and served back through the static
//! `/uploads` mount.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::format::{file_extension, validate_upload};
use super::UploadError;

/// A stored upload: filesystem path plus the URL clients use to fetch it.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub url: String,
}

/// Writes validated uploads into the configured directory.
pub struct UploadStore {
    dir: PathBuf,
    max_size: usize,
}

impl UploadStore {
    /// Create the store, making sure the directory exists.
    pub fn new(dir: &Path, max_size: usize) -> Result<Self, UploadError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            max_size,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and persist one upload. Nothing is written when validation
    /// fails, so no partial file is ever retained.
    pub fn save(
        &self,
        original_filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, UploadError> {
        validate_upload(original_filename, content_type, bytes.len(), self.max_size)?;

        let ext = file_extension(original_filename);
        let stored_name = format!("{}{ext}", Uuid::new_v4());
        let path = self.dir.join(&stored_name);

        std::fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            path,
            url: format!("/uploads/{stored_name}"),
        })
    }

    /// Remove a stored file. Returns whether anything was deleted.
    pub fn delete(&self, path: &Path) -> Result<bool, UploadError> {
        if !path.starts_with(&self.dir) || !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }
}
