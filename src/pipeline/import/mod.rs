pub mod format;
pub mod store;

pub use format::{sanitize_filename, validate_upload};
pub use store::{StoredFile, UploadStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File type not allowed: {0}")]
    InvalidFileType(String),

    #[error("File too large: {size} bytes (maximum {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
