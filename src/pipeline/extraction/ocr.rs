//! Recognition engine adapters.
//!
//! The production engine wraps Tesseract configured for combined
//! English+Spanish vocabulary, full-page automatic segmentation and LSTM
//! recognition. It sits behind the `ocr` cargo feature so the rest of the
//! service builds without the native libraries; tests run against the mock.

use super::types::OcrEngine;
use super::ExtractionError;

/// Bundled Tesseract engine. Only available with the `ocr` feature.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    /// Language string, e.g. "eng+spa".
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// OEM 3 = default LSTM engine.
    const OCR_ENGINE_MODE: &'static str = "3";
    /// PSM 3 = fully automatic page segmentation.
    const PAGE_SEG_MODE: &'static str = "3";

    pub fn new(languages: &str) -> Self {
        Self {
            languages: languages.to_string(),
        }
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let tess = tesseract::Tesseract::new(None, Some(&self.languages))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let tess = tess
            .set_variable("tessedit_ocr_engine_mode", Self::OCR_ENGINE_MODE)
            .and_then(|t| t.set_variable("tessedit_pageseg_mode", Self::PAGE_SEG_MODE))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        tracing::debug!(chars = text.len(), "Recognition produced text");
        Ok(text)
    }
}

/// Placeholder engine for builds without the `ocr` feature: every call
/// reports a clear initialization error instead of silently returning
/// empty text.
pub struct UnavailableOcrEngine;

impl OcrEngine for UnavailableOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, ExtractionError> {
        Err(ExtractionError::OcrInit(
            "built without the `ocr` feature; no recognition engine available".into(),
        ))
    }
}

/// Mock recognition engine for unit testing.
/// Returns the configured text for every call, or a configured failure.
pub struct MockOcrEngine {
    responses: std::sync::Mutex<Vec<Result<String, String>>>,
    fallback: String,
}

impl MockOcrEngine {
    /// Always return `text`.
    pub fn new(text: &str) -> Self {
        Self {
            responses: std::sync::Mutex::new(Vec::new()),
            fallback: text.to_string(),
        }
    }

    /// Return each queued response once (front first), then the fallback.
    /// Lets a test exercise the advanced→simple preprocessing fallback,
    /// where the same engine is called twice with different images.
    pub fn with_sequence(responses: Vec<Result<String, String>>, fallback: &str) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            fallback: fallback.to_string(),
        }
    }

    /// Always fail with an OCR processing error.
    pub fn failing(message: &str) -> Self {
        Self::with_sequence(vec![Err(message.to_string())], message)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut queue = self.responses.lock().expect("mock lock");
        if queue.is_empty() {
            return Ok(self.fallback.clone());
        }
        match queue.remove(0) {
            Ok(text) => Ok(text),
            Err(msg) => Err(ExtractionError::OcrProcessing(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_text() {
        let engine = MockOcrEngine::new("ACME STORE\nTotal 10.00");
        let text = engine.recognize(b"fake").unwrap();
        assert_eq!(text, "ACME STORE\nTotal 10.00");
    }

    #[test]
    fn mock_sequence_drains_then_falls_back() {
        let engine = MockOcrEngine::with_sequence(vec![Ok("first".into())], "later");
        assert_eq!(engine.recognize(b"a").unwrap(), "first");
        assert_eq!(engine.recognize(b"b").unwrap(), "later");
        assert_eq!(engine.recognize(b"c").unwrap(), "later");
    }

    #[test]
    fn failing_mock_surfaces_processing_error() {
        let engine = MockOcrEngine::failing("engine crashed");
        let err = engine.recognize(b"x").unwrap_err();
        assert!(matches!(err, ExtractionError::OcrProcessing(_)));
    }

    #[test]
    fn unavailable_engine_reports_missing_feature() {
        let err = UnavailableOcrEngine.recognize(b"x").unwrap_err();
        assert!(matches!(err, ExtractionError::OcrInit(_)));
        assert!(err.to_string().contains("ocr"));
    }
}
