//! Image preparation for OCR.
//!
//! Steps, in order:
//! 1. size guard on the raw bytes
//! 2. decode and fix EXIF orientation (phone photos of printed resumes)
//! 3. grayscale (ITU-R BT.601 luminance)
//! 4. global binarization at the Otsu threshold
//! 5. re-encode as lossless PNG for the OCR engine

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};
use tracing::debug;

use super::ExtractionError;

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Run the full preparation chain and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    validate_image_bytes(image_bytes)?;

    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to decode image: {e}")))?;
    let oriented = apply_orientation(decoded, read_exif_orientation(image_bytes));

    let gray = rgb_to_gray(&oriented.to_rgb8());
    let level = otsu_level(&gray);
    let binary = binarize(&gray, level);

    debug!(
        width = binary.width(),
        height = binary.height(),
        otsu_level = level,
        "Prepared image for OCR"
    );

    encode_gray_png(&binary)
}

/// Validate image bytes before decoding.
/// Returns early error for clearly invalid input, saves decode time.
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
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
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

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let p = rgb.get_pixel(x, y);
            let luma = (0.299 * p.0[0] as f32
                + 0.587 * p.0[1] as f32
                + 0.114 * p.0[2] as f32) as u8;
            gray.put_pixel(x, y, Luma([luma]));
        }
    }
    gray
}

/// Otsu's threshold: the intensity that maximises between-class variance
/// of the grayscale histogram.
///
/// Pixels strictly above the returned level are foreground (white).
/// Ties keep the lowest level. Uniform images return 0.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut weighted_bg = 0.0f64;
    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        weighted_bg += level as f64 * count as f64;
        let mean_bg = weighted_bg / weight_bg as f64;
        let mean_fg = (weighted_total - weighted_bg) / weight_fg as f64;

        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if between > best_variance {
            best_variance = between;
            best_level = level as u8;
        }
    }

    best_level
}

/// Binary threshold: `> level` becomes 255, everything else 0.
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > level { 255 } else { 0 };
    }
    out
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_gray_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
