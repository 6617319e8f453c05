use std::path::Path;

use tracing::{debug, info, warn};

use super::docx::extract_docx_text;
use super::pdfium::DEFAULT_RENDER_DPI;
use super::preprocess::prepare_for_ocr;
use super::sanitize::strip_control_chars;
use super::strategy::{is_sufficient, meets_minimum, strategies_for, ExtractionStrategy};
use super::types::{
    DocumentKind, DocumentReference, ExtractedText, OcrEngine, PdfExtractor, PdfPageRenderer,
    TextExtractor,
};
use super::ExtractionError;

/// Minimum characters a resume or job description must reach.
pub const DEFAULT_MIN_CHARS: usize = 300;

/// Concrete implementation of the text extractor.
/// Uses trait objects for OCR and PDF access, enabling dependency injection.
pub struct DocumentExtractor {
    ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    pdf_renderer: Option<Box<dyn PdfPageRenderer + Send + Sync>>,
    min_chars: usize,
    render_dpi: u32,
}

impl DocumentExtractor {
    pub fn new(
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
        pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    ) -> Self {
        Self {
            ocr_engine,
            pdf_extractor,
            pdf_renderer: None,
            min_chars: DEFAULT_MIN_CHARS,
            render_dpi: DEFAULT_RENDER_DPI,
        }
    }

    /// Add a PDF page renderer for per-page OCR of scanned PDFs.
    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfPageRenderer + Send + Sync>) -> Self {
        self.pdf_renderer = Some(renderer);
        self
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }

    /// Run the strategy cascade for one file.
    fn extract_file(&self, path: &Path, kind: DocumentKind) -> Result<ExtractedText, ExtractionError> {
        info!(path = %path.display(), kind = kind.as_str(), "Starting text extraction");
        let bytes = std::fs::read(path)?;

        let plan = strategies_for(kind);
        let mut short_output = None;
        for &strategy in plan.preferred {
            match self.run_strategy(strategy, &bytes) {
                Ok(raw) => {
                    let text = strip_control_chars(&raw);
                    if is_sufficient(&text, self.min_chars) {
                        return self.accept(text, strategy);
                    }
                    let chars = text.chars().count();
                    debug!(strategy = strategy.as_str(), chars, "Output too short, trying next strategy");
                    short_output = Some(chars);
                }
                Err(e) => {
                    warn!(strategy = strategy.as_str(), error = %e, "Strategy failed, trying next");
                }
            }
        }

        match self.run_strategy(plan.last_resort, &bytes) {
            Ok(raw) => self.accept(strip_control_chars(&raw), plan.last_resort),
            Err(e) => match short_output {
                Some(found) => Err(ExtractionError::FallbackFailed {
                    found,
                    required: self.min_chars,
                    fallback: plan.last_resort,
                    source: Box::new(e),
                }),
                None => Err(e),
            },
        }
    }

    fn run_strategy(
        &self,
        strategy: ExtractionStrategy,
        bytes: &[u8],
    ) -> Result<String, ExtractionError> {
        match strategy {
            ExtractionStrategy::PdfTextLayer => {
                Ok(self.pdf_extractor.extract_pages(bytes)?.join("\n"))
            }
            ExtractionStrategy::PdfPageOcr => self.ocr_pdf_pages(bytes),
            ExtractionStrategy::ImageOcr => {
                let prepared = prepare_for_ocr(bytes)?;
                Ok(self.ocr_engine.ocr_image(&prepared)?.text)
            }
            ExtractionStrategy::DocxParagraphs => extract_docx_text(bytes),
        }
    }

    /// Render, binarize and OCR every page in order; pages join with `\n`.
    fn ocr_pdf_pages(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let renderer = self
            .pdf_renderer
            .as_deref()
            .ok_or_else(|| ExtractionError::PdfRendering {
                page: 0,
                reason: "no page renderer configured".into(),
            })?;

        let page_count = renderer.page_count(pdf_bytes)?;
        let mut pages = Vec::with_capacity(page_count);
        for page in 0..page_count {
            let rendered = renderer.render_page(pdf_bytes, page, self.render_dpi)?;
            let prepared = prepare_for_ocr(&rendered)?;
            let result = self.ocr_engine.ocr_image(&prepared)?;
            debug!(
                page,
                chars = result.text.chars().count(),
                confidence = ?result.confidence,
                "OCR'd PDF page"
            );
            pages.push(result.text);
        }
        Ok(pages.join("\n"))
    }

    fn accept(
        &self,
        text: String,
        strategy: ExtractionStrategy,
    ) -> Result<ExtractedText, ExtractionError> {
        let char_count = text.chars().count();
        if !meets_minimum(&text, self.min_chars) {
            return Err(ExtractionError::InsufficientText {
                found: char_count,
                required: self.min_chars,
            });
        }

        info!(
            strategy = strategy.as_str(),
            ocr = strategy.uses_ocr(),
            chars = char_count,
            "Text extraction complete"
        );
        Ok(ExtractedText {
            text,
            strategy: Some(strategy),
            char_count,
        })
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, input: &str) -> Result<ExtractedText, ExtractionError> {
        match DocumentReference::resolve(input, self.min_chars)? {
            DocumentReference::Text(text) => Ok(ExtractedText {
                char_count: text.chars().count(),
                text,
                strategy: None,
            }),
            DocumentReference::File { path, kind } => self.extract_file(&path, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::extraction::docx::test_docx::make_test_docx;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::test_pdf::make_test_pdf;
    use crate::pipeline::extraction::pdf::PdfTextExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;
    use crate::pipeline::extraction::types::OcrPageResult;

    /// Shares a mock OCR engine with the test so call counts stay visible.
    struct SharedOcr(Arc<MockOcrEngine>);

    impl OcrEngine for SharedOcr {
        fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
            self.0.ocr_image(image_bytes)
        }
    }

    enum MockPdfExtractor {
        Pages(Vec<String>),
        Broken,
    }

    impl PdfExtractor for MockPdfExtractor {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            match self {
                Self::Pages(pages) => Ok(pages.clone()),
                Self::Broken => Err(ExtractionError::PdfParsing("xref table damaged".into())),
            }
        }
    }

    fn extractor(ocr: &Arc<MockOcrEngine>, pdf: MockPdfExtractor) -> DocumentExtractor {
        DocumentExtractor::new(Box::new(SharedOcr(ocr.clone())), Box::new(pdf))
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn noisy_png() -> Vec<u8> {
        let img = image::RgbImage::from_fn(48, 48, |x, y| {
            let base: u8 = if (x + y) % 4 == 0 { 20 } else { 230 };
            let level = base + ((x * y) % 9) as u8;
            image::Rgb([level, level, level])
        });
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn digital_pdf_uses_text_layer_without_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "resume.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::new("unused"));
        let pages = vec!["a".repeat(200), "b".repeat(200)];

        let result = extractor(&ocr, MockPdfExtractor::Pages(pages.clone()))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(2)))
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::PdfTextLayer));
        assert_eq!(result.text, pages.join("\n"));
        assert_eq!(result.char_count, 401);
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn real_pdf_text_layer_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let line = "Senior Python Engineer with AWS and Kubernetes experience building data platforms";
        let pdf = make_test_pdf(&[line, line, line, line, line]);
        let path = write_file(&dir, "digital.pdf", &pdf);
        let ocr = Arc::new(MockOcrEngine::new("unused"));

        let result = DocumentExtractor::new(Box::new(SharedOcr(ocr.clone())), Box::new(PdfTextExtractor))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(5)))
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::PdfTextLayer));
        assert!(result.text.contains("Kubernetes"));
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn scanned_pdf_ocrs_every_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "scan.pdf", b"%PDF-1.4 stub");
        let page_texts = vec!["first ".repeat(30), "second ".repeat(30), "third ".repeat(30)];
        let ocr = Arc::new(MockOcrEngine::per_page(page_texts.clone()));

        let result = extractor(&ocr, MockPdfExtractor::Pages(vec![String::new(); 3]))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(3)))
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::PdfPageOcr));
        assert_eq!(result.text, page_texts.join("\n"));
        assert_eq!(ocr.call_count(), 3);
    }

    #[test]
    fn text_layer_at_exact_threshold_still_falls_back_to_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "edge.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::new(&"o".repeat(320)));

        let result = extractor(&ocr, MockPdfExtractor::Pages(vec!["t".repeat(300)]))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::PdfPageOcr));
        assert_eq!(result.char_count, 320);
        assert_eq!(ocr.call_count(), 1);
    }

    #[test]
    fn broken_text_layer_falls_through_to_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "damaged.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::new(&"x".repeat(310)));

        let result = extractor(&ocr, MockPdfExtractor::Broken)
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::PdfPageOcr));
    }

    #[test]
    fn short_ocr_output_reports_found_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "faint.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::new(&"z".repeat(120)));

        let err = extractor(&ocr, MockPdfExtractor::Pages(vec![String::new()]))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .extract(path.to_str().unwrap())
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::InsufficientText { found: 120, required: 300 }
        ));
    }

    #[test]
    fn scanned_pdf_without_renderer_surfaces_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "scan.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::new("unused"));

        let err = extractor(&ocr, MockPdfExtractor::Pages(vec![String::new()]))
            .extract(path.to_str().unwrap())
            .unwrap_err();

        match err {
            ExtractionError::FallbackFailed { found, fallback, source, .. } => {
                assert_eq!(found, 0);
                assert_eq!(fallback, ExtractionStrategy::PdfPageOcr);
                assert!(matches!(*source, ExtractionError::PdfRendering { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn short_text_layer_count_survives_ocr_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "thin.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::failing("engine crashed"));

        let err = extractor(&ocr, MockPdfExtractor::Pages(vec!["t".repeat(120)]))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .extract(path.to_str().unwrap())
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("found 120 characters"), "{message}");
        assert!(message.contains("engine crashed"), "{message}");
        assert!(matches!(
            err,
            ExtractionError::FallbackFailed { found: 120, required: 300, .. }
        ));
    }

    #[test]
    fn failed_text_layer_then_failed_ocr_reports_the_ocr_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "damaged.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::failing("engine crashed"));

        let err = extractor(&ocr, MockPdfExtractor::Broken)
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .extract(path.to_str().unwrap())
            .unwrap_err();

        assert!(matches!(err, ExtractionError::OcrProcessing(_)));
    }

    #[test]
    fn ocr_failure_on_last_strategy_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "scan.png", &noisy_png());
        let ocr = Arc::new(MockOcrEngine::failing("engine crashed"));

        let err = extractor(&ocr, MockPdfExtractor::Broken)
            .extract(path.to_str().unwrap())
            .unwrap_err();

        assert!(matches!(err, ExtractionError::OcrProcessing(_)));
    }

    #[test]
    fn control_characters_are_removed_before_counting() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "ctl.pdf", b"%PDF-1.4 stub");
        let layer = format!("{}\x00\x01\x02{}", "a".repeat(150), "b".repeat(151));
        let ocr = Arc::new(MockOcrEngine::new("unused"));

        let result = extractor(&ocr, MockPdfExtractor::Pages(vec![layer]))
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.char_count, 301);
        assert!(!result.text.contains('\x00'));
    }

    #[test]
    fn image_goes_through_binarization_and_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "resume.PNG", &noisy_png());
        let text = "Experienced data engineer. ".repeat(15);
        let ocr = Arc::new(MockOcrEngine::new(&text));

        let result = extractor(&ocr, MockPdfExtractor::Broken)
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::ImageOcr));
        assert_eq!(result.text, text);
        assert_eq!(ocr.call_count(), 1);
    }

    #[test]
    fn docx_paragraphs_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let para = "Led a team of five engineers migrating services to AWS Lambda and ECS.";
        let path = write_file(&dir, "cv.docx", &make_test_docx(&[para, para, para, para, para]));
        let ocr = Arc::new(MockOcrEngine::new("unused"));

        let result = extractor(&ocr, MockPdfExtractor::Broken)
            .extract(path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.strategy, Some(ExtractionStrategy::DocxParagraphs));
        assert_eq!(result.text, vec![para; 5].join("\n"));
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn long_text_input_passes_through_verbatim() {
        let ocr = Arc::new(MockOcrEngine::new("unused"));
        let text = format!("  Job description:\t{}  ", "requirements ".repeat(30));

        let result = extractor(&ocr, MockPdfExtractor::Broken).extract(&text).unwrap();

        assert_eq!(result.strategy, None);
        assert_eq!(result.text, text);
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn short_text_input_is_invalid() {
        let ocr = Arc::new(MockOcrEngine::new("unused"));
        let err = extractor(&ocr, MockPdfExtractor::Broken)
            .extract("3 years Python, no cloud experience")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidInput { min_chars: 300 }));
    }

    #[test]
    fn custom_minimum_applies_to_files_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "short.pdf", b"%PDF-1.4 stub");
        let ocr = Arc::new(MockOcrEngine::new("unused"));
        let extractor = extractor(&ocr, MockPdfExtractor::Pages(vec!["c".repeat(11)]))
            .with_min_chars(10);

        assert_eq!(extractor.extract(path.to_str().unwrap()).unwrap().char_count, 11);
        assert!(extractor.extract("0123456789").is_ok());
    }

    #[test]
    fn unsupported_file_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "resume.odt", b"whatever");
        let ocr = Arc::new(MockOcrEngine::new("unused"));

        let err = extractor(&ocr, MockPdfExtractor::Broken)
            .extract(path.to_str().unwrap())
            .unwrap_err();

        assert!(matches!(err, ExtractionError::UnsupportedFormat { ref extension } if extension == "odt"));
    }
}
