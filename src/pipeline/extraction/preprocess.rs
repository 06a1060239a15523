//! Image preprocessing for recognition input.
//!
//! Two pipelines feed the recognizer:
//! - **Simple**: upscale small scans, grayscale, sharpen, hard contrast
//!   boost — approximates binarization without thresholding. Safe on any
//!   input, never destroys content.
//! - **Advanced**: grayscale, 2x upscale, median denoise, Otsu binarization,
//!   then erasure of long horizontal/vertical line segments via morphological
//!   opening with elongated structuring elements — strips table borders that
//!   confuse the recognizer on tabular receipts and invoices.
//!
//! The advanced pipeline can eat real content on line-heavy logos, so the
//! orchestrator runs it first and falls back to the simple pipeline when the
//! recognized text comes back suspiciously short.
//!
//! EXIF orientation is corrected before either pipeline — receipts are phone
//! photos and the rotation lives in EXIF tag 0x0112.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageOutputFormat, Luma};
use tracing::debug;

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Scans narrower than this get upscaled before recognition.
const MIN_WIDTH_PX: u32 = 1000;

/// Upscale target width for small scans.
const UPSCALE_TARGET_PX: u32 = 2000;

/// Contrast multiplier for the simple pipeline (near-binarization).
const CONTRAST_FACTOR: f32 = 3.0;

/// Structuring-element length for line detection is the dimension divided by
/// this; anything shorter than the element survives as content.
const LINE_KERNEL_DIVISOR: u32 = 30;

/// Floor for the structuring-element length on small images.
const LINE_KERNEL_MIN_PX: u32 = 20;

// ═══════════════════════════════════════════════════════════
// Pipelines
// ═══════════════════════════════════════════════════════════

/// Simple pipeline: upscale → grayscale → sharpen → contrast boost.
/// Returns PNG bytes ready for the recognizer. The input is never mutated.
pub fn preprocess_simple(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    validate_image_bytes(image_bytes)?;
    let img = decode_oriented(image_bytes)?;
    let img = upscale_if_small(img);
    let gray = img.to_luma8();
    let gray = sharpen(&gray);
    let gray = boost_contrast(&gray, CONTRAST_FACTOR);
    encode_png(&gray)
}

/// Advanced pipeline: grayscale → 2x upscale → denoise → Otsu binarize
/// (inverted) → erase long line segments → restore normal polarity.
pub fn preprocess_advanced(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    validate_image_bytes(image_bytes)?;
    let img = decode_oriented(image_bytes)?;
    let (w, h) = img.dimensions();
    let img = img.resize_exact(w * 2, h * 2, FilterType::CatmullRom);
    let gray = img.to_luma8();
    let gray = median3x3(&gray);

    let threshold = otsu_threshold(&gray);
    let binary = binarize_inverted(&gray, threshold);
    let cleaned = remove_long_lines(&binary);
    let restored = invert(&cleaned);

    debug!(
        threshold,
        width = restored.width(),
        height = restored.height(),
        "Advanced preprocessing complete"
    );
    encode_png(&restored)
}

fn decode_oriented(image_bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to decode image: {e}")))?;
    let orientation = read_exif_orientation(image_bytes);
    Ok(apply_orientation(img, orientation))
}

/// Upscale narrow scans so small fonts survive recognition.
fn upscale_if_small(img: DynamicImage) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w >= MIN_WIDTH_PX {
        return img;
    }
    let scale = UPSCALE_TARGET_PX as f32 / w as f32;
    let new_h = ((h as f32 * scale).round() as u32).max(1);
    debug!(from = w, to = UPSCALE_TARGET_PX, "Upscaling small scan");
    img.resize_exact(UPSCALE_TARGET_PX, new_h, FilterType::Lanczos3)
}

// ═══════════════════════════════════════════════════════════
// EXIF orientation
// ═══════════════════════════════════════════════════════════

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

// ═══════════════════════════════════════════════════════════
// Grayscale transforms
// ═══════════════════════════════════════════════════════════

/// 3x3 sharpening convolution (center-weighted).
pub fn sharpen(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    if w < 3 || h < 3 {
        return img.clone();
    }

    let mut out = img.clone();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = img.get_pixel(x, y).0[0] as i32;
            let top = img.get_pixel(x, y - 1).0[0] as i32;
            let bottom = img.get_pixel(x, y + 1).0[0] as i32;
            let left = img.get_pixel(x - 1, y).0[0] as i32;
            let right = img.get_pixel(x + 1, y).0[0] as i32;

            let value = 5 * center - top - bottom - left - right;
            out.put_pixel(x, y, Luma([value.clamp(0, 255) as u8]));
        }
    }
    out
}

/// Multiply contrast around the image mean (Pillow-style enhancer).
/// A factor of ~3 pushes a document scan close to black-and-white without
/// committing to a threshold.
pub fn boost_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let pixel_count = (img.width() as u64) * (img.height() as u64);
    if pixel_count == 0 {
        return img.clone();
    }

    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    let mean = sum as f32 / pixel_count as f32;

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let value = mean + (pixel.0[0] as f32 - mean) * factor;
        pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// 3x3 median filter: removes salt-and-pepper scanner noise while keeping
/// glyph edges.
pub fn median3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    if w < 3 || h < 3 {
        return img.clone();
    }

    let mut out = img.clone();
    let mut window = [0u8; 9];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut i = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    window[i] = img.get_pixel(x + dx - 1, y + dy - 1).0[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Compute the Otsu threshold from the grayscale histogram: the split that
/// maximizes between-class variance.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(v, &count)| v as f64 * count as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;
    let mut background_count = 0u64;
    let mut background_sum = 0.0f64;

    for threshold in 0..256usize {
        background_count += histogram[threshold];
        if background_count == 0 {
            continue;
        }
        let foreground_count = total - background_count;
        if foreground_count == 0 {
            break;
        }

        background_sum += threshold as f64 * histogram[threshold] as f64;
        let mean_bg = background_sum / background_count as f64;
        let mean_fg = (weighted_total - background_sum) / foreground_count as f64;

        let variance = background_count as f64
            * foreground_count as f64
            * (mean_bg - mean_fg)
            * (mean_bg - mean_fg);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = threshold as u8;
        }
    }

    best_threshold
}

/// Binarize with inverted polarity: ink becomes white (255), paper black (0).
/// Morphology below operates on white structures.
pub fn binarize_inverted(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] <= threshold { 255 } else { 0 };
    }
    out
}

pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = 255 - pixel.0[0];
    }
    out
}

/// Erase long horizontal and vertical segments (table borders) from an
/// inverted binary image. Opening with an elongated structuring element
/// keeps only structures at least as long as the element; subtracting them
/// leaves text intact.
pub fn remove_long_lines(binary: &GrayImage) -> GrayImage {
    let (w, h) = (binary.width(), binary.height());
    let h_kernel = (w / LINE_KERNEL_DIVISOR).max(LINE_KERNEL_MIN_PX);
    let v_kernel = (h / LINE_KERNEL_DIVISOR).max(LINE_KERNEL_MIN_PX);

    let horizontal_lines = opening_horizontal(binary, h_kernel);
    let vertical_lines = opening_vertical(binary, v_kernel);

    let mut out = binary.clone();
    for y in 0..h {
        for x in 0..w {
            if horizontal_lines.get_pixel(x, y).0[0] == 255
                || vertical_lines.get_pixel(x, y).0[0] == 255
            {
                out.put_pixel(x, y, Luma([0]));
            }
        }
    }
    out
}

/// Morphological opening with a 1×k horizontal structuring element.
fn opening_horizontal(img: &GrayImage, k: u32) -> GrayImage {
    dilate_runs(&erode_runs(img, k, true), k, true)
}

/// Morphological opening with a k×1 vertical structuring element.
fn opening_vertical(img: &GrayImage, k: u32) -> GrayImage {
    dilate_runs(&erode_runs(img, k, false), k, false)
}

/// Erosion along one axis: a pixel survives only if the whole k-window
/// around it is white.
fn erode_runs(img: &GrayImage, k: u32, horizontal: bool) -> GrayImage {
    morph_runs(img, k, horizontal, true)
}

/// Dilation along one axis: a pixel lights up if any pixel in the k-window
/// is white.
fn dilate_runs(img: &GrayImage, k: u32, horizontal: bool) -> GrayImage {
    morph_runs(img, k, horizontal, false)
}

fn morph_runs(img: &GrayImage, k: u32, horizontal: bool, erode: bool) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    let mut out = GrayImage::new(w, h);
    let half = (k / 2) as i64;

    for y in 0..h {
        for x in 0..w {
            let mut all_white = true;
            let mut any_white = false;
            for offset in -half..=half {
                let (sx, sy) = if horizontal {
                    (x as i64 + offset, y as i64)
                } else {
                    (x as i64, y as i64 + offset)
                };
                let white = if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                    false
                } else {
                    img.get_pixel(sx as u32, sy as u32).0[0] == 255
                };
                all_white &= white;
                any_white |= white;
                if erode && !all_white {
                    break;
                }
            }
            let lit = if erode { all_white } else { any_white };
            out.put_pixel(x, y, Luma([if lit { 255 } else { 0 }]));
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════
// Shared helpers
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
/// Returns early error for clearly invalid input, saving decode time.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn make_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, Rgb([value, value, value]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let mut cursor = Cursor::new(Vec::new());
        dynamic.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn decode_gray(bytes: &[u8]) -> GrayImage {
        image::load_from_memory(bytes).unwrap().to_luma8()
    }

    // ── simple pipeline ──

    #[test]
    fn small_scan_upscaled_to_target_width() {
        let png = make_png(500, 800, 128);
        let result = preprocess_simple(&png).unwrap();
        let out = decode_gray(&result);
        assert_eq!(out.width(), 2000);
        assert_eq!(out.height(), 3200);
    }

    #[test]
    fn wide_scan_keeps_dimensions() {
        let png = make_png(1200, 900, 128);
        let result = preprocess_simple(&png).unwrap();
        let out = decode_gray(&result);
        assert_eq!(out.width(), 1200);
        assert_eq!(out.height(), 900);
    }

    #[test]
    fn rejects_too_small_input() {
        let result = preprocess_simple(&[0x89, 0x50]);
        assert!(matches!(result, Err(ExtractionError::ImageProcessing(_))));
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF].repeat(25);
        assert!(preprocess_simple(&garbage).is_err());
    }

    // ── advanced pipeline ──

    #[test]
    fn advanced_doubles_dimensions() {
        let png = make_png(200, 100, 200);
        let result = preprocess_advanced(&png).unwrap();
        let out = decode_gray(&result);
        assert_eq!(out.width(), 400);
        assert_eq!(out.height(), 200);
    }

    // ── contrast ──

    #[test]
    fn contrast_leaves_uniform_image_unchanged() {
        let img = GrayImage::from_pixel(10, 10, Luma([100]));
        let out = boost_contrast(&img, 3.0);
        assert!(out.pixels().all(|p| p.0[0] == 100));
    }

    #[test]
    fn contrast_pushes_values_apart() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([100]));
        img.put_pixel(1, 0, Luma([150]));
        // mean = 125; 100 → 125 − 75 = 50, 150 → 125 + 75 = 200
        let out = boost_contrast(&img, 3.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 50);
        assert_eq!(out.get_pixel(1, 0).0[0], 200);
    }

    // ── median ──

    #[test]
    fn median_removes_lone_speck() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([255]));
        img.put_pixel(2, 2, Luma([0]));
        let out = median3x3(&img);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
    }

    // ── otsu ──

    #[test]
    fn otsu_separates_bimodal_histogram() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([220]));
        for x in 0..10 {
            img.put_pixel(x, 0, Luma([30]));
            img.put_pixel(x, 1, Luma([30]));
        }
        let threshold = otsu_threshold(&img);
        assert!(threshold >= 30 && threshold < 220, "got {threshold}");
    }

    #[test]
    fn binarize_inverted_maps_ink_to_white() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([10]));
        img.put_pixel(1, 0, Luma([240]));
        let out = binarize_inverted(&img, 128);
        assert_eq!(out.get_pixel(0, 0).0[0], 255); // dark ink → white
        assert_eq!(out.get_pixel(1, 0).0[0], 0); // paper → black
    }

    // ── line removal ──

    #[test]
    fn long_horizontal_line_is_erased_but_blob_survives() {
        // Inverted binary canvas: black background, white structures.
        let mut img = GrayImage::from_pixel(120, 60, Luma([0]));
        // Long horizontal rule across the full width
        for x in 0..120 {
            img.put_pixel(x, 30, Luma([255]));
        }
        // Small 3x3 text-like blob
        for dy in 0..3 {
            for dx in 0..3 {
                img.put_pixel(10 + dx, 10 + dy, Luma([255]));
            }
        }

        let cleaned = remove_long_lines(&img);

        let line_pixels: u32 = (0..120)
            .map(|x| u32::from(cleaned.get_pixel(x, 30).0[0] == 255))
            .sum();
        assert!(line_pixels < 10, "line should be mostly erased, {line_pixels} left");
        assert_eq!(cleaned.get_pixel(11, 11).0[0], 255, "blob must survive");
    }

    #[test]
    fn vertical_line_is_erased() {
        let mut img = GrayImage::from_pixel(60, 120, Luma([0]));
        for y in 0..120 {
            img.put_pixel(30, y, Luma([255]));
        }
        let cleaned = remove_long_lines(&img);
        let line_pixels: u32 = (0..120)
            .map(|y| u32::from(cleaned.get_pixel(30, y).0[0] == 255))
            .sum();
        assert!(line_pixels < 10, "{line_pixels} left");
    }

    // ── EXIF orientation ──

    #[test]
    fn exif_missing_returns_identity() {
        let png = make_png(10, 10, 128);
        assert_eq!(read_exif_orientation(&png), 1);
    }

    #[test]
    fn orientation_six_rotates_90() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 20));
        let out = apply_orientation(img, 6);
        assert_eq!(out.width(), 20);
        assert_eq!(out.height(), 10);
    }

    #[test]
    fn orientation_unknown_is_identity() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 20));
        let out = apply_orientation(img, 99);
        assert_eq!(out.width(), 10);
        assert_eq!(out.height(), 20);
    }
}
