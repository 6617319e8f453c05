use std::panic::{catch_unwind, AssertUnwindSafe};

use super::types::PdfExtractor;
use super::ExtractionError;

/// PDF text-layer extractor using the pdf-extract crate.
/// Only digital PDFs yield text here; scans come back as empty pages.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed font tables.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|_| ExtractionError::PdfParsing("text layer decoder panicked".into()))?;

        outcome.map_err(|e| {
            let message = e.to_string();
            if message.to_lowercase().contains("encrypt") {
                ExtractionError::PdfEncrypted
            } else {
                ExtractionError::PdfParsing(message)
            }
        })
    }
}
