use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::CorpusError;
use crate::pipeline::extraction::TextExtractor;
use crate::pipeline::table::write_rows_atomic;

pub const FILENAME_COLUMN: &str = "filename";
pub const TEXT_COLUMN: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub filename: String,
    pub text: String,
}

/// Processing order for the files of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileOrder {
    /// Sorted by file name.
    #[default]
    Sorted,
    /// Shuffled from a fresh random seed.
    Shuffled,
    /// Shuffled reproducibly.
    Seeded(u64),
}

#[derive(Debug, Clone, Default)]
pub struct CorpusSummary {
    pub total_files: usize,
    pub extracted: usize,
    pub failed: Vec<(usize, String)>,
}

/// Extracts every file in a directory into a (filename, text) table.
pub struct CorpusFormatter<'a> {
    extractor: &'a dyn TextExtractor,
    order: FileOrder,
}

impl<'a> CorpusFormatter<'a> {
    pub fn new(extractor: &'a dyn TextExtractor) -> Self {
        Self {
            extractor,
            order: FileOrder::Sorted,
        }
    }

    pub fn with_order(mut self, order: FileOrder) -> Self {
        self.order = order;
        self
    }

    /// The output is rewritten after every extracted file, so an interrupted
    /// run keeps what it finished. Failing files are logged and skipped.
    pub fn run(&self, input_dir: &Path, output: &Path) -> Result<CorpusSummary, CorpusError> {
        let files = self.list_files(input_dir)?;
        let total = files.len();
        info!(input_dir = %input_dir.display(), files = total, "Formatting document corpus");

        let mut records = Vec::new();
        let mut summary = CorpusSummary {
            total_files: total,
            ..Default::default()
        };

        for (index, path) in files.iter().enumerate() {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!(file = index + 1, total, filename = %filename, "Processing file");

            match self.extractor.extract(&path.to_string_lossy()) {
                Ok(extracted) => {
                    records.push(CorpusRecord {
                        filename,
                        text: extracted.text,
                    });
                    write_rows_atomic(output, &[FILENAME_COLUMN, TEXT_COLUMN], &records)?;
                    summary.extracted += 1;
                }
                Err(e) => {
                    warn!(file = index + 1, filename = %filename, error = %e, "Skipping file");
                    summary.failed.push((index, e.to_string()));
                }
            }
        }

        info!(
            extracted = summary.extracted,
            failed = summary.failed.len(),
            output = %output.display(),
            "Corpus formatting complete"
        );
        Ok(summary)
    }

    /// Regular files only, enumerated once up front.
    fn list_files(&self, input_dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
        let read_err = |source| CorpusError::InputDir {
            path: input_dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(input_dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        match self.order {
            FileOrder::Sorted => {}
            FileOrder::Shuffled => files.shuffle(&mut StdRng::from_entropy()),
            FileOrder::Seeded(seed) => files.shuffle(&mut StdRng::seed_from_u64(seed)),
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{ExtractedText, ExtractionError, ExtractionStrategy};
    use crate::pipeline::table::read_rows;

    /// Returns the file stem as text, refuses anything named `bad*`.
    struct StemExtractor;

    impl TextExtractor for StemExtractor {
        fn extract(&self, input: &str) -> Result<ExtractedText, ExtractionError> {
            let stem = Path::new(input)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if stem.starts_with("bad") {
                return Err(ExtractionError::InsufficientText {
                    found: 0,
                    required: 300,
                });
            }
            Ok(ExtractedText {
                char_count: stem.len(),
                text: format!("text of {stem}"),
                strategy: Some(ExtractionStrategy::PdfTextLayer),
            })
        }
    }

    fn corpus_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn extracts_files_in_name_order_and_skips_failures() {
        let input = corpus_dir(&["b.pdf", "a.pdf", "bad.pdf", "c.docx"]);
        std::fs::create_dir(input.path().join("nested")).unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("texts.csv");

        let summary = CorpusFormatter::new(&StemExtractor).run(input.path(), &output).unwrap();

        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.extracted, 3);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, 2);

        let rows: Vec<CorpusRecord> = read_rows(&output, &[FILENAME_COLUMN, TEXT_COLUMN]).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.docx"]);
        assert_eq!(rows[2].text, "text of c");
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let names: Vec<String> = (0..12).map(|i| format!("cv{i:02}.pdf")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let input = corpus_dir(&refs);
        let formatter = CorpusFormatter::new(&StemExtractor).with_order(FileOrder::Seeded(7));

        let first = formatter.list_files(input.path()).unwrap();
        let second = formatter.list_files(input.path()).unwrap();
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, CorpusFormatter::new(&StemExtractor).list_files(input.path()).unwrap());
    }

    #[test]
    fn all_failures_leave_no_output() {
        let input = corpus_dir(&["bad1.pdf", "bad2.png"]);
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("never.csv");

        let summary = CorpusFormatter::new(&StemExtractor).run(input.path(), &output).unwrap();
        assert_eq!(summary.extracted, 0);
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CorpusFormatter::new(&StemExtractor)
            .run(&dir.path().join("absent"), &dir.path().join("out.csv"))
            .unwrap_err();
        assert!(matches!(err, CorpusError::InputDir { .. }));
    }
}
