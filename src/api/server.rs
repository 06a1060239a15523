//! Server assembly and startup.

use std::sync::Arc;

use tracing::{info, warn};

use super::{build_router, AppState};
use crate::config::AppConfig;
use crate::db::open_database;
use crate::pipeline::extraction::pdf::PdfiumRasterizer;
use crate::pipeline::extraction::types::{OcrEngine, PageRasterizer};
use crate::pipeline::extraction::{ExtractionConfig, ExtractionError, ReceiptProcessor};
use crate::pipeline::import::UploadStore;
use crate::pipeline::reconcile::MockBankFeed;

/// Wire up state and serve until shutdown.
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = open_database(&config.database_path)?;
    info!(path = %config.database_path.display(), "Database ready");

    let uploads = UploadStore::new(&config.upload_dir, config.max_upload_size)?;
    let extraction_config = ExtractionConfig::from_app_config(&config);
    let processor = ReceiptProcessor::new(
        build_engine(&config),
        build_rasterizer(),
        extraction_config,
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, db, processor, uploads, Arc::new(MockBankFeed::new()));
    let app = build_router(state);

    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "ocr")]
fn build_engine(config: &AppConfig) -> Box<dyn OcrEngine> {
    Box::new(crate::pipeline::extraction::ocr::BundledTesseract::new(
        &config.ocr_languages,
    ))
}

#[cfg(not(feature = "ocr"))]
fn build_engine(_config: &AppConfig) -> Box<dyn OcrEngine> {
    warn!("Built without the `ocr` feature; uploads will fail until enabled");
    Box::new(crate::pipeline::extraction::ocr::UnavailableOcrEngine)
}

/// PDFium is a runtime dependency; when it is missing the service still
/// starts and handles plain images, while PDF uploads report the problem.
fn build_rasterizer() -> Box<dyn PageRasterizer> {
    match PdfiumRasterizer::new() {
        Ok(rasterizer) => Box::new(rasterizer),
        Err(e) => {
            warn!(error = %e, "PDFium unavailable; PDF uploads will fail");
            Box::new(UnavailableRasterizer)
        }
    }
}

struct UnavailableRasterizer;

impl PageRasterizer for UnavailableRasterizer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Err(ExtractionError::PdfRendering {
            page: 0,
            reason: "PDFium library not available".into(),
        })
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        _page_number: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        Err(ExtractionError::PdfRendering {
            page: 0,
            reason: "PDFium library not available".into(),
        })
    }
}
