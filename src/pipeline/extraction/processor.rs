//! Receipt processing orchestrator: preprocess → recognize → detect
//! currency → extract fields.
//!
//! One call per upload, no shared mutable state: the whole pipeline is a
//! pure function of the input bytes. Recognition is CPU-bound and invokes an
//! external engine, so callers run `process` on a blocking worker and wrap
//! it in a timeout.

use tracing::{debug, info, warn};

use super::currency::detect_currency;
use super::fields::extract_fields;
use super::pdf::DEFAULT_RENDER_DPI;
use super::preprocess::{preprocess_advanced, preprocess_simple};
use super::types::{
    ExtractedFields, ExtractionConfig, OcrEngine, PageRasterizer, PAGE_BREAK,
};
use super::ExtractionError;
use crate::models::enums::Currency;

/// Advanced preprocessing sometimes erases real content along with table
/// borders. Recognized text shorter than this (non-whitespace chars) triggers
/// a redo with the simple pipeline on the original image.
const FALLBACK_MIN_CHARS: usize = 50;

/// Composes the extraction pipeline over injected collaborators.
pub struct ReceiptProcessor {
    engine: Box<dyn OcrEngine>,
    rasterizer: Box<dyn PageRasterizer>,
    config: ExtractionConfig,
    render_dpi: u32,
}

impl ReceiptProcessor {
    pub fn new(
        engine: Box<dyn OcrEngine>,
        rasterizer: Box<dyn PageRasterizer>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            engine,
            rasterizer,
            config,
            render_dpi: DEFAULT_RENDER_DPI,
        }
    }

    /// Full pipeline for one upload. Returns the raw recognized text, the
    /// detected currency and the extracted fields; the caller attaches the
    /// confidence bucket and hands everything to the review screen.
    pub fn process(
        &self,
        file_bytes: &[u8],
        content_type: &str,
    ) -> Result<(String, Currency, ExtractedFields), ExtractionError> {
        let raw_text = self.recognize_document(file_bytes, content_type)?;
        let currency = detect_currency(&raw_text, &self.config);
        let fields = extract_fields(&raw_text, currency, &self.config);

        info!(
            content_type,
            currency = %currency,
            populated = fields.populated_count(),
            chars = raw_text.len(),
            "Receipt processed"
        );
        Ok((raw_text, currency, fields))
    }

    /// Dispatch on content type: images recognize directly, PDFs are
    /// rasterized per page and joined with the page-break marker. Anything
    /// else fails fast before recognition work.
    fn recognize_document(
        &self,
        file_bytes: &[u8],
        content_type: &str,
    ) -> Result<String, ExtractionError> {
        if content_type.starts_with("image/") {
            self.recognize_image(file_bytes)
        } else if content_type == "application/pdf" {
            self.recognize_pdf(file_bytes)
        } else {
            Err(ExtractionError::UnsupportedFormat(content_type.to_string()))
        }
    }

    /// Recognize one image: advanced pipeline first, simple pipeline redo
    /// when the result looks like line-removal destroyed content.
    fn recognize_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let advanced = preprocess_advanced(image_bytes)?;
        let text = self.engine.recognize(&advanced)?;

        if non_whitespace_chars(&text) >= FALLBACK_MIN_CHARS {
            return Ok(text);
        }

        warn!(
            chars = non_whitespace_chars(&text),
            "Advanced preprocessing produced little text, redoing with simple pipeline"
        );
        let simple = preprocess_simple(image_bytes)?;
        self.engine.recognize(&simple)
    }

    fn recognize_pdf(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = self.rasterizer.page_count(pdf_bytes)?;
        debug!(pages, "Rasterizing PDF for recognition");

        let mut page_texts = Vec::with_capacity(pages);
        for page in 0..pages {
            let rendered = self.rasterizer.render_page(pdf_bytes, page, self.render_dpi)?;
            page_texts.push(self.recognize_image(&rendered)?);
        }
        Ok(page_texts.join(PAGE_BREAK))
    }
}

fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
