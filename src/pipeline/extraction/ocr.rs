use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::pdfium::MockPdfPageRenderer;
use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Tesseract driven through its command-line binary.
///
/// The image goes in on stdin and TSV comes back on stdout, so no temp
/// files are written. Text is rebuilt line by line from the word rows.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    languages: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCli {
    /// Verify the binary runs and, when given, that tessdata holds English.
    pub fn new(
        binary: impl Into<PathBuf>,
        languages: &str,
        tessdata_dir: Option<PathBuf>,
    ) -> Result<Self, ExtractionError> {
        let binary = binary.into();

        if let Some(dir) = &tessdata_dir {
            if !dir.join("eng.traineddata").exists() {
                return Err(ExtractionError::TessdataNotFound(dir.clone()));
            }
        }

        let version = Command::new(&binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                ExtractionError::OcrInit(format!("cannot run {}: {e}", binary.display()))
            })?;
        if !version.status.success() {
            return Err(ExtractionError::OcrInit(format!(
                "{} --version exited with {}",
                binary.display(),
                version.status
            )));
        }
        let banner = String::from_utf8_lossy(&version.stdout);
        debug!(
            binary = %binary.display(),
            version = banner.lines().next().unwrap_or("unknown"),
            languages,
            "Tesseract CLI ready"
        );

        Ok(Self {
            binary,
            languages: languages.to_string(),
            tessdata_dir,
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout").arg("-l").arg(&self.languages);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("tsv");
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractionError::OcrInit(format!("cannot spawn tesseract: {e}")))?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| ExtractionError::OcrProcessing("tesseract stdin unavailable".into()))?;
            stdin.write_all(image_bytes)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(page_from_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Tesseract linked in-process. Only built with the `ocr` feature.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    pub fn new(tessdata_dir: &std::path::Path, languages: &str) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            languages: languages.to_string(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let tessdata = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("tessdata path is not UTF-8".into()))?;

        let mut tess = tesseract::Tesseract::new(Some(tessdata), Some(&self.languages))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;
        let confidence = tess.mean_text_conf();

        Ok(OcrPageResult {
            text,
            confidence: (confidence >= 0).then(|| confidence as f32 / 100.0),
        })
    }
}

/// Rebuild page text and mean word confidence from Tesseract TSV.
///
/// Columns: level page block par line word left top width height conf text.
/// Only level-5 (word) rows carry text. Words on the same
/// (block, par, line) join with a space; lines join with `\n`.
fn page_from_tsv(tsv: &str) -> OcrPageResult {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key: Option<(u32, u32, u32)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0usize;

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }
        let key = match (fields[2].parse(), fields[3].parse(), fields[4].parse()) {
            (Ok(b), Ok(p), Ok(l)) => (b, p, l),
            _ => continue,
        };

        if let Ok(conf) = fields[10].parse::<f32>() {
            if conf >= 0.0 {
                conf_sum += conf / 100.0;
                conf_count += 1;
            }
        }

        match lines.last_mut() {
            Some(line) if current_key == Some(key) => {
                line.push(' ');
                line.push_str(word);
            }
            _ => {
                lines.push(word.to_string());
                current_key = Some(key);
            }
        }
    }

    OcrPageResult {
        text: lines.join("\n"),
        confidence: (conf_count > 0).then(|| conf_sum / conf_count as f32),
    }
}

/// Stand-in when no OCR backend could be initialised. Every call fails with
/// the startup reason, so text-layer PDFs and Word files still extract.
#[derive(Debug, Clone)]
pub struct UnavailableOcr {
    reason: String,
}

impl UnavailableOcr {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrEngine for UnavailableOcr {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        Err(ExtractionError::OcrInit(self.reason.clone()))
    }
}

enum MockOcrBehavior {
    Fixed(String),
    /// Pick the response by page index decoded from a `MockPdfPageRenderer` image.
    PerPage(Vec<String>),
    Fail(String),
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    behavior: MockOcrBehavior,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self::with_behavior(MockOcrBehavior::Fixed(text.to_string()))
    }

    pub fn per_page(pages: Vec<String>) -> Self {
        Self::with_behavior(MockOcrBehavior::PerPage(pages))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_behavior(MockOcrBehavior::Fail(reason.to_string()))
    }

    fn with_behavior(behavior: MockOcrBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = match &self.behavior {
            MockOcrBehavior::Fixed(text) => text.clone(),
            MockOcrBehavior::PerPage(pages) => {
                let width = image::load_from_memory(image_bytes)
                    .map_err(|e| ExtractionError::OcrProcessing(e.to_string()))?
                    .to_luma8()
                    .width();
                let page = MockPdfPageRenderer::page_from_width(width);
                pages.get(page).cloned().ok_or_else(|| {
                    ExtractionError::OcrProcessing(format!("no mock text for page {page}"))
                })?
            }
            MockOcrBehavior::Fail(reason) => {
                return Err(ExtractionError::OcrProcessing(reason.clone()))
            }
        };
        Ok(OcrPageResult {
            text,
            confidence: Some(0.9),
        })
    }
}
