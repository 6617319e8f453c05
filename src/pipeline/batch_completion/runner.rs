//! BatchCompleter: labels every (JD, Resume) pair with the model.
//!
//! Strictly sequential. Progress is derived from the output table itself, so
//! a killed run restarts at the first row without a persisted label. Rows are
//! at-least-once: a crash between inference and rewrite repeats that row.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use super::error::{CompletionError, RowError};
use super::store::{first_misaligned_row, read_pairs, resume_index, LabelStore};
use super::types::{BatchSummary, CompletionEvent, LabelRecord, PairRow, SkippedRow};
use crate::pipeline::extraction::TextExtractor;
use crate::pipeline::labeling::{build_label_prompt, validate_label, LabelProducer};

pub struct BatchCompleter<'a> {
    producer: &'a dyn LabelProducer,
    document_resolver: Option<&'a dyn TextExtractor>,
}

impl<'a> BatchCompleter<'a> {
    pub fn new(producer: &'a dyn LabelProducer) -> Self {
        Self {
            producer,
            document_resolver: None,
        }
    }

    /// Cells naming an existing file are replaced by the file's extracted text.
    pub fn with_document_resolver(mut self, extractor: &'a dyn TextExtractor) -> Self {
        self.document_resolver = Some(extractor);
        self
    }

    /// Read the pair list at `pairs_path` and complete it into `store`.
    pub fn run(
        &self,
        pairs_path: &Path,
        store: &LabelStore,
        progress: Option<&dyn Fn(&CompletionEvent)>,
    ) -> Result<BatchSummary, CompletionError> {
        let pairs = read_pairs(pairs_path)?;
        self.complete(&pairs, store, progress)
    }

    pub fn complete(
        &self,
        pairs: &[PairRow],
        store: &LabelStore,
        progress: Option<&dyn Fn(&CompletionEvent)>,
    ) -> Result<BatchSummary, CompletionError> {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let _span = info_span!("batch_completion", run_id = %run_id).entered();
        let emit = |event: CompletionEvent| {
            if let Some(progress) = progress {
                progress(&event);
            }
        };

        let mut accumulator = store.load()?;
        emit(CompletionEvent::Initialized {
            total_rows: pairs.len(),
            persisted: accumulator.len(),
        });

        let mut start_index = resume_index(&accumulator);
        if start_index > pairs.len() {
            warn!(
                persisted = start_index,
                total_rows = pairs.len(),
                "Output holds more rows than the input, nothing left to do"
            );
            start_index = pairs.len();
        }
        if self.document_resolver.is_none() {
            if let Some(row) = first_misaligned_row(&accumulator, pairs) {
                warn!(
                    row,
                    resume_at = start_index,
                    "Output row does not match the input row at the same position, \
                     an earlier run skipped rows; resuming by count relabels some rows \
                     and never retries the skipped ones"
                );
            }
        }

        if start_index > 0 {
            info!(from = start_index, total_rows = pairs.len(), "Resuming batch");
            emit(CompletionEvent::Resuming { from: start_index });
        } else {
            info!(total_rows = pairs.len(), output = %store.path().display(), "Starting batch");
            emit(CompletionEvent::Starting);
        }

        let mut accepted = 0usize;
        let mut skipped: Vec<SkippedRow> = Vec::new();
        let mut last_accepted = None;

        for (index, row) in pairs.iter().enumerate().skip(start_index) {
            emit(CompletionEvent::ProcessingRow { index });
            let row_started = Instant::now();

            match self.label_row(row) {
                Ok(record) => {
                    accumulator.push(record);
                    store.rewrite(&accumulator)?;
                    accepted += 1;
                    last_accepted = Some(index);
                    info!(
                        row = index,
                        latency_ms = row_started.elapsed().as_millis() as u64,
                        persisted = accumulator.len(),
                        "Row labeled"
                    );
                    emit(CompletionEvent::RowAccepted { index });
                }
                Err(e) => {
                    let kind = e.kind();
                    warn!(row = index, kind, error = %e, "Skipping row");
                    emit(CompletionEvent::RowSkipped { index, kind });
                    skipped.push(SkippedRow {
                        index,
                        kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let (Some(first_skip), Some(last)) = (skipped.first(), last_accepted) {
            if first_skip.index < last {
                warn!(
                    first_skipped = first_skip.index,
                    resume_at = accumulator.len(),
                    "Rows were skipped before later accepted rows; a rerun resumes by \
                     count, relabels rows already done and does not retry the skipped ones"
                );
            }
        }

        let summary = BatchSummary {
            run_id,
            start_index,
            total_rows: pairs.len(),
            accepted,
            skipped,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            accepted = summary.accepted,
            skipped = summary.skipped.len(),
            duration_ms = summary.duration_ms,
            "Batch complete"
        );
        emit(CompletionEvent::Complete {
            accepted: summary.accepted,
            skipped: summary.skipped.len(),
        });
        Ok(summary)
    }

    /// prompt -> infer -> validate. Nothing here touches the output.
    fn label_row(&self, row: &PairRow) -> Result<LabelRecord, RowError> {
        let job_description = self.resolve_cell(&row.job_description)?;
        let resume = self.resolve_cell(&row.resume)?;

        let instruction = build_label_prompt(&resume, &job_description);
        let response = self.producer.infer(&instruction)?;
        let label = validate_label(&response)?;
        debug!(match_score = ?label.match_score(), "Label validated");

        Ok(LabelRecord {
            job_description,
            resume,
            response,
        })
    }

    fn resolve_cell(&self, cell: &str) -> Result<String, RowError> {
        match self.document_resolver {
            Some(extractor) if Path::new(cell).is_file() => Ok(extractor.extract(cell)?.text),
            _ => Ok(cell.to_string()),
        }
    }
}
