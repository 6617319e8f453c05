//! Ordered extraction strategies per document kind.
//!
//! Each kind maps to a fixed list tried front to back. A non-final strategy
//! only wins when its cleaned output strictly exceeds the minimum length;
//! the final strategy's output is always used and checked by the caller.

use serde::{Deserialize, Serialize};

use super::types::DocumentKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Embedded text layer of a digital PDF.
    PdfTextLayer,
    /// Every PDF page rasterized and OCR'd in page order.
    PdfPageOcr,
    /// Binarized image OCR.
    ImageOcr,
    /// Paragraph text of a Word document.
    DocxParagraphs,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfTextLayer => "pdf_text_layer",
            Self::PdfPageOcr => "pdf_page_ocr",
            Self::ImageOcr => "image_ocr",
            Self::DocxParagraphs => "docx_paragraphs",
        }
    }

    pub fn uses_ocr(&self) -> bool {
        matches!(self, Self::PdfPageOcr | Self::ImageOcr)
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategies for one document kind: `preferred` in order, then `last_resort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPlan {
    pub preferred: &'static [ExtractionStrategy],
    pub last_resort: ExtractionStrategy,
}

impl StrategyPlan {
    /// Every strategy in the order it is tried.
    pub fn iter(&self) -> impl Iterator<Item = ExtractionStrategy> + '_ {
        self.preferred
            .iter()
            .copied()
            .chain(std::iter::once(self.last_resort))
    }
}

/// Strategies to try for a document kind, cheapest first.
pub fn strategies_for(kind: DocumentKind) -> StrategyPlan {
    match kind {
        DocumentKind::Pdf => StrategyPlan {
            preferred: &[ExtractionStrategy::PdfTextLayer],
            last_resort: ExtractionStrategy::PdfPageOcr,
        },
        DocumentKind::Image => StrategyPlan {
            preferred: &[],
            last_resort: ExtractionStrategy::ImageOcr,
        },
        DocumentKind::WordDocument => StrategyPlan {
            preferred: &[],
            last_resort: ExtractionStrategy::DocxParagraphs,
        },
    }
}

/// Whether a non-final strategy's cleaned output is good enough to stop.
pub fn is_sufficient(text: &str, min_chars: usize) -> bool {
    text.chars().count() > min_chars
}

/// Final acceptance check applied once, after the cascade.
pub fn meets_minimum(text: &str, min_chars: usize) -> bool {
    text.chars().count() >= min_chars
}
