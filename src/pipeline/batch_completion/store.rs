use std::path::{Path, PathBuf};

use super::types::{LabelRecord, PairRow, JD_COLUMN, RESPONSE_COLUMN, RESUME_COLUMN};
use crate::pipeline::table::{read_rows, write_rows_atomic, TableError};

/// Read the unlabeled (JD, Resume) pair list once.
pub fn read_pairs(path: &Path) -> Result<Vec<PairRow>, TableError> {
    read_rows(path, &[JD_COLUMN, RESUME_COLUMN])
}

/// First input row still to process, derived from what is already persisted.
///
/// Every persisted row is an accepted row, so progress is its count.
pub fn resume_index(persisted: &[LabelRecord]) -> usize {
    persisted.len()
}

/// First persisted row whose cells differ from the pair at the same index.
///
/// Resuming by count assumes row `i` of the output labels input row `i`;
/// a skipped row earlier in the output breaks that and shows up here.
/// Only meaningful when cells are stored verbatim.
pub fn first_misaligned_row(persisted: &[LabelRecord], pairs: &[PairRow]) -> Option<usize> {
    persisted
        .iter()
        .zip(pairs)
        .position(|(record, pair)| {
            record.job_description != pair.job_description || record.resume != pair.resume
        })
}

/// The label output table. Rewritten whole after every accepted row.
#[derive(Debug, Clone)]
pub struct LabelStore {
    path: PathBuf,
}

impl LabelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted rows, or none when the output does not exist yet.
    pub fn load(&self) -> Result<Vec<LabelRecord>, TableError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_rows(&self.path, &[JD_COLUMN, RESUME_COLUMN, RESPONSE_COLUMN])
    }

    pub fn rewrite(&self, records: &[LabelRecord]) -> Result<(), TableError> {
        write_rows_atomic(&self.path, &[JD_COLUMN, RESUME_COLUMN, RESPONSE_COLUMN], records)
    }
}
