use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::strategy::ExtractionStrategy;
use super::ExtractionError;

/// File categories the extractor knows how to read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    WordDocument,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::WordDocument => "word_document",
        }
    }

    /// Classify by file extension (case-insensitive).
    /// Returns `UnsupportedFormat` carrying the extension exactly as written.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Ok(Self::Image),
            "docx" => Ok(Self::WordDocument),
            _ => Err(ExtractionError::UnsupportedFormat { extension }),
        }
    }
}

/// What the caller handed us: a file on disk or resume text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReference {
    File { path: PathBuf, kind: DocumentKind },
    Text(String),
}

impl DocumentReference {
    /// Validate and classify a raw input string.
    ///
    /// A readable file wins over text interpretation. Anything else must reach
    /// `min_chars` once surrounding whitespace is trimmed.
    pub fn resolve(input: &str, min_chars: usize) -> Result<Self, ExtractionError> {
        let path = Path::new(input);
        if path.is_file() {
            let kind = DocumentKind::from_path(path)?;
            return Ok(Self::File {
                path: path.to_path_buf(),
                kind,
            });
        }

        if input.trim().chars().count() >= min_chars {
            return Ok(Self::Text(input.to_string()));
        }

        Err(ExtractionError::InvalidInput { min_chars })
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    /// `None` when the input was already text.
    pub strategy: Option<ExtractionStrategy>,
    pub char_count: usize,
}

/// Raw OCR result from the engine
#[derive(Debug)]
pub struct OcrPageResult {
    pub text: String,
    /// Mean word confidence in 0.0..=1.0, when the engine reports one.
    pub confidence: Option<f32>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    /// OCR a single encoded image (PNG).
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF text-layer extraction abstraction
pub trait PdfExtractor {
    /// Text of each page in page order.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Rasterizes PDF pages for OCR.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render a zero-indexed page to PNG bytes.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Main extraction trait: document reference in, clean text out.
pub trait TextExtractor {
    fn extract(&self, input: &str) -> Result<ExtractedText, ExtractionError>;
}
