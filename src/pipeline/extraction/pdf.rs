//! PDF page rendering via Google PDFium.
//!
//! Multi-page documents are rasterized one page at a time and each page runs
//! through the same preprocessing + recognition path as a plain image.
//!
//! `PdfiumRasterizer` is stateless (`Send + Sync`). Each operation creates a
//! fresh `Pdfium` instance because the upstream type is `!Send`; the OS
//! caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::io::Cursor;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::debug;

use super::types::PageRasterizer;
use super::ExtractionError;

/// Default rendering DPI for recognition. 200 DPI balances glyph fidelity
/// against per-page decode cost.
pub const DEFAULT_RENDER_DPI: u32 = 200;

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd DPI settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// Renders PDF pages to PNG images using Google PDFium.
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Create a new rasterizer, verifying the PDFium library is loadable
    /// (fail-fast at startup rather than on the first upload).
    pub fn new() -> Result<Self, ExtractionError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path to library file)
/// 2. Alongside the running executable
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings =
            Pdfium::bind_to_library(&path).map_err(|e| ExtractionError::PdfRendering {
                page: 0,
                reason: format!("Failed to load PDFium from {path}: {e}"),
            })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %exe_dir.display(), "Loaded PDFium from executable directory");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| ExtractionError::PdfRendering {
        page: 0,
        reason: format!("PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"),
    })?;
    Ok(Pdfium::new(bindings))
}

/// Compute pixel dimensions for rendering, applying the dimension guard.
/// Preserves aspect ratio when capping.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| ExtractionError::PdfRendering {
                page: 0,
                reason: format!("Failed to load PDF: {e}"),
            })?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_number,
                reason: format!("Failed to load PDF: {e}"),
            })?;

        let page = document
            .pages()
            .get(page_number as u16)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_number,
                reason: format!("Page not found: {e}"),
            })?;

        let (w, h) = compute_render_dimensions(page.width().value, page.height().value, dpi);
        let render_config = PdfRenderConfig::new()
            .set_target_width(w as i32)
            .set_maximum_height(h as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_number,
                reason: format!("Render failed: {e}"),
            })?;

        let img = bitmap.as_image();
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_number,
                reason: format!("PNG encoding failed: {e}"),
            })?;

        debug!(
            page = page_number,
            width = w,
            height = h,
            png_size = cursor.get_ref().len(),
            "Rendered PDF page"
        );
        Ok(cursor.into_inner())
    }
}

/// Mock rasterizer for unit tests: a fixed number of pages, each rendering
/// to the same tiny PNG.
pub struct MockPageRasterizer {
    pages: usize,
    png: Vec<u8>,
}

impl MockPageRasterizer {
    pub fn new(pages: usize) -> Self {
        let img = image::GrayImage::from_pixel(32, 32, image::Luma([255]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .expect("encode mock page");
        Self {
            pages,
            png: cursor.into_inner(),
        }
    }
}

impl PageRasterizer for MockPageRasterizer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.pages)
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_number: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        if page_number >= self.pages {
            return Err(ExtractionError::PdfRendering {
                page: page_number,
                reason: "page out of range".into(),
            });
        }
        Ok(self.png.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_dimensions_scale_with_dpi() {
        // US Letter at 200 DPI: 8.5in × 11in → 1700 × 2200
        let (w, h) = compute_render_dimensions(612.0, 792.0, 200);
        assert_eq!(w, 1700);
        assert_eq!(h, 2200);
    }

    #[test]
    fn render_dimensions_capped_with_aspect() {
        let (w, h) = compute_render_dimensions(612.0, 792.0, 1200);
        assert!(w <= MAX_DIMENSION_PX && h <= MAX_DIMENSION_PX);
        let ratio = w as f32 / h as f32;
        assert!((ratio - 612.0 / 792.0).abs() < 0.01);
    }

    #[test]
    fn mock_renders_in_range_pages_only() {
        let raster = MockPageRasterizer::new(2);
        assert_eq!(raster.page_count(b"pdf").unwrap(), 2);
        assert!(raster.render_page(b"pdf", 1, 200).is_ok());
        assert!(raster.render_page(b"pdf", 2, 200).is_err());
    }

    #[test]
    fn mock_page_is_decodable() {
        let raster = MockPageRasterizer::new(1);
        let png = raster.render_page(b"pdf", 0, 200).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.width(), 32);
    }
}
