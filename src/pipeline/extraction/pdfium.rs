//! Page rasterization for scanned PDFs via Google PDFium.
//!
//! `PdfiumRenderer` holds no library handle: the upstream `Pdfium` type is
//! `!Send`, so each call binds the library again. The OS caches the
//! `dlopen`, which keeps repeat binds cheap.

use std::io::Cursor;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Longest edge allowed for a rendered page.
const MAX_DIMENSION_PX: u32 = 4096;

/// Rendering resolution used when none is configured.
pub const DEFAULT_RENDER_DPI: u32 = 300;

const POINTS_PER_INCH: f32 = 72.0;

pub struct PdfiumRenderer;

impl PdfiumRenderer {
    /// Fails fast when the PDFium library cannot be bound.
    pub fn new() -> Result<Self, ExtractionError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Bind the PDFium dynamic library.
///
/// Looks at `PDFIUM_DYNAMIC_LIB_PATH`, then next to the executable
/// (and its `lib/` sibling), then the system search path.
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Binding PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| ExtractionError::PdfRendering {
            page: 0,
            reason: format!("cannot load PDFium from {path}: {e}"),
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        for dir in [exe_dir.clone(), exe_dir.join("lib"), exe_dir.join("..").join("lib")] {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %dir.display(), "Bound PDFium next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| ExtractionError::PdfRendering {
        page: 0,
        reason: format!("PDFium not found, set PDFIUM_DYNAMIC_LIB_PATH: {e}"),
    })?;
    Ok(Pdfium::new(bindings))
}

fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfRendering {
            page: 0,
            reason: format!("cannot open PDF: {msg}"),
        }
    }
}

/// Pixel size of a page at `dpi`, both edges clamped to `1..=MAX_DIMENSION_PX`
/// with the aspect ratio kept when capping.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let longest = raw_w.max(raw_h);
    if longest <= MAX_DIMENSION_PX as f32 {
        return (raw_w.round() as u32, raw_h.round() as u32);
    }

    let ratio = MAX_DIMENSION_PX as f32 / longest;
    let clamp = |v: f32| ((v * ratio).round() as u32).clamp(1, MAX_DIMENSION_PX);
    (clamp(raw_w), clamp(raw_h))
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;
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
            .map_err(map_load_error)?;
        let pages = document.pages();

        let render_err = |reason: String| ExtractionError::PdfRendering {
            page: page_number,
            reason,
        };

        let index = u16::try_from(page_number)
            .map_err(|_| render_err(format!("page index {page_number} out of range")))?;
        let page = pages.get(index).map_err(|_| {
            render_err(format!(
                "page {page_number} out of range ({} pages)",
                pages.len()
            ))
        })?;

        let (width_pt, height_pt) = (page.width().value, page.height().value);
        let (target_w, target_h) = compute_render_dimensions(width_pt, height_pt, dpi);
        if target_w.max(target_h) == MAX_DIMENSION_PX {
            warn!(
                page = page_number,
                dpi,
                width = target_w,
                height = target_h,
                "Page render capped at {MAX_DIMENSION_PX}px"
            );
        }

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_err(e.to_string()))?;

        let mut cursor = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
        let png = cursor.into_inner();

        debug!(
            page = page_number,
            width = target_w,
            height = target_h,
            png_size = png.len(),
            "Rendered PDF page"
        );
        Ok(png)
    }
}

/// Mock renderer for tests that need scanned-PDF behavior without PDFium.
///
/// Page `n` renders as a `(40 + n)`-pixel-wide two-tone image, so the page
/// index survives binarization and can be recovered by a mock OCR engine.
pub struct MockPdfPageRenderer {
    page_count: usize,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self { page_count }
    }

    /// Inverse of the width encoding used by `render_page`.
    pub fn page_from_width(width: u32) -> usize {
        width.saturating_sub(40) as usize
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_number: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        if page_number >= self.page_count {
            return Err(ExtractionError::PdfRendering {
                page: page_number,
                reason: format!("page {page_number} out of range ({} pages)", self.page_count),
            });
        }
        let width = 40 + page_number as u32;
        let page = image::RgbImage::from_fn(width, 40, |x, y| {
            let noise = ((x * 3 + y * 7) % 13) as u8;
            let level = if x < width / 2 { 15 + noise } else { 225 + noise };
            image::Rgb([level, level, level])
        });

        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(page)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}
