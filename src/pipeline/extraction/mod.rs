pub mod types;
pub mod sanitize;
pub mod preprocess;
pub mod strategy;
pub mod pdf;
pub mod pdfium;
pub mod ocr;
pub mod docx;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use strategy::*;
pub use pdf::*;
pub use ocr::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Input is neither a readable file nor text of at least {min_chars} characters")]
    InvalidInput { min_chars: usize },

    #[error("Unsupported file format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("Insufficient text extracted: found {found} characters, need at least {required}")]
    InsufficientText { found: usize, required: usize },

    #[error(
        "Insufficient text extracted: found {found} characters, need at least {required}; \
         {fallback} fallback failed: {source}"
    )]
    FallbackFailed {
        found: usize,
        required: usize,
        fallback: ExtractionStrategy,
        #[source]
        source: Box<ExtractionError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is encrypted or password-protected")]
    PdfEncrypted,

    #[error("Word document parsing failed: {0}")]
    DocxParsing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),
}
