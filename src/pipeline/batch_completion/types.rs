use serde::{Deserialize, Serialize};

/// Column names of the pair list and the label output.
pub const JD_COLUMN: &str = "JD";
pub const RESUME_COLUMN: &str = "Resume";
pub const RESPONSE_COLUMN: &str = "Response";

/// One unlabeled input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRow {
    #[serde(rename = "JD")]
    pub job_description: String,
    #[serde(rename = "Resume")]
    pub resume: String,
}

/// One accepted output row. `response` is the model's text, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    #[serde(rename = "JD")]
    pub job_description: String,
    #[serde(rename = "Resume")]
    pub resume: String,
    #[serde(rename = "Response")]
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub index: usize,
    pub kind: &'static str,
    pub reason: String,
}

/// What a completion run did.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    /// First input row this run looked at.
    pub start_index: usize,
    pub total_rows: usize,
    pub accepted: usize,
    pub skipped: Vec<SkippedRow>,
    pub duration_ms: u64,
}

impl BatchSummary {
    /// Rows this run attempted.
    pub fn processed(&self) -> usize {
        self.accepted + self.skipped.len()
    }
}

/// State transitions reported while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    Initialized { total_rows: usize, persisted: usize },
    Resuming { from: usize },
    Starting,
    ProcessingRow { index: usize },
    RowAccepted { index: usize },
    RowSkipped { index: usize, kind: &'static str },
    Complete { accepted: usize, skipped: usize },
}
