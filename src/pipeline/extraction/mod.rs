pub mod confidence;
pub mod corrections;
pub mod currency;
pub mod fields;
pub mod ocr;
pub mod pdf;
pub mod preprocess;
pub mod processor;
pub mod types;

pub use processor::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported content type: {0}")]
    UnsupportedFormat(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Recognition timed out after {secs}s")]
    RecognitionTimeout { secs: u64 },
}
