use serde::{Deserialize, Serialize};

use super::corrections::VendorCorrection;
use super::ExtractionError;
use crate::models::enums::{Currency, ExtractionConfidence};

/// Literal separator between recognized pages of a multi-page document.
pub const PAGE_BREAK: &str = "\n\n--- PAGE BREAK ---\n\n";

/// Structured fields pulled from recognized receipt text.
///
/// Absent fields are omitted from serialized output, never defaulted to zero.
/// `subtotal` is always derived (`total − tax − tip`), never pattern-matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Normalized ISO-8601 date (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
}

impl ExtractedFields {
    /// Number of populated fields, the completeness signal behind the
    /// confidence bucket.
    pub fn populated_count(&self) -> usize {
        [
            self.vendor.is_some(),
            self.date.is_some(),
            self.total.is_some(),
            self.tax.is_some(),
            self.tip.is_some(),
            self.subtotal.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }
}

/// The per-upload result handed back for human review. Never persisted;
/// the caller decides whether to materialize an Expense from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub raw_text: String,
    pub detected_currency: Currency,
    pub extracted_fields: ExtractedFields,
    pub confidence: ExtractionConfidence,
}

/// OCR engine abstraction (allows mocking for tests).
pub trait OcrEngine: Send + Sync {
    /// Recognize text in a preprocessed image.
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF page rasterization abstraction.
pub trait PageRasterizer: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render one page to encoded image bytes at the given DPI.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Immutable lookup tables for the extraction engine, built once at process
/// start and injected, not scattered constants.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Keywords leaning toward US dollars.
    pub usd_keywords: Vec<String>,
    /// Keywords leaning toward Mexican pesos.
    pub mxn_keywords: Vec<String>,
    /// Lines containing these are never vendor candidates (doc-type headers).
    pub vendor_stop_words: Vec<String>,
    /// US sales-tax rate used by the tax-inference fallback.
    pub regional_sales_tax_rate: f64,
    /// Registered vendor-specific misread overrides.
    pub corrections: Vec<VendorCorrection>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            usd_keywords: ["usd", "dollar", "sales tax", "$", "us", "taxpayer id"]
                .map(String::from)
                .to_vec(),
            mxn_keywords: ["mxn", "peso", "iva", "rfc", "mx", "factura", "folio"]
                .map(String::from)
                .to_vec(),
            vendor_stop_words: [
                "invoice", "factura", "receipt", "recibo", "ticket", "nota", "original",
                "servicio", "service",
            ]
            .map(String::from)
            .to_vec(),
            regional_sales_tax_rate: 0.0825,
            corrections: Vec::new(),
        }
    }
}

impl ExtractionConfig {
    /// Build the table set from app configuration, loading the optional
    /// corrections file.
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        let corrections = match &config.corrections_file {
            Some(path) => match VendorCorrection::load_from_file(path) {
                Ok(list) => {
                    tracing::info!(count = list.len(), path = %path.display(), "Loaded vendor corrections");
                    list
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable corrections file");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Self {
            regional_sales_tax_rate: config.regional_sales_tax_rate,
            corrections,
            ..Self::default()
        }
    }
}
