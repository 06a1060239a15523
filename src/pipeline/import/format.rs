//! Upload validation: extension and content-type allow-lists, size cap,
//! filename hygiene.
//!
//! Violations fail before any file is written, so no partial upload is ever
//! retained.

use std::path::Path;

use super::UploadError;

/// Accepted file extensions (lowercase, with dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".pdf", ".gif", ".bmp"];

/// Accepted declared content types. `image/jpg` is non-standard but common
/// enough in the wild to allow.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "application/pdf",
];

/// Validate an incoming upload against the allow-lists and the size cap.
pub fn validate_upload(
    original_filename: &str,
    content_type: &str,
    size: usize,
    max_size: usize,
) -> Result<(), UploadError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(UploadError::InvalidFileType(format!(
            "content type {content_type} not allowed (allowed: {})",
            ALLOWED_CONTENT_TYPES.join(", ")
        )));
    }

    let ext = file_extension(original_filename);
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::InvalidFileType(format!(
            "extension {ext:?} not allowed (allowed: {})",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    // Extensions can be wrong: cross-check the declared content type against
    // what the extension implies, at the top-level type granularity
    // (image/jpg vs image/jpeg is fine, image/png on a .pdf is not).
    let guessed = mime_guess::from_path(original_filename).first_or_octet_stream();
    let declared_top = content_type.split('/').next().unwrap_or("");
    if guessed.type_() != declared_top {
        return Err(UploadError::InvalidFileType(format!(
            "content type {content_type} does not match extension {ext}"
        )));
    }

    if size > max_size {
        return Err(UploadError::FileTooLarge {
            size,
            max: max_size,
        });
    }

    Ok(())
}

/// Lowercased extension including the dot, empty string if none.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Sanitize a filename: strip path components, limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("receipt");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "receipt".to_string()
    } else {
        clean
    }
}
