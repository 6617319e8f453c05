use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::CorpusError;
use crate::pipeline::batch_completion::{PairRow, JD_COLUMN, RESUME_COLUMN};
use crate::pipeline::table::{read_rows, write_rows_atomic};

/// Column holding one job description per row in the JD table.
pub const JOB_DESCRIPTION_COLUMN: &str = "Job Description";

#[derive(Debug, Deserialize)]
struct JobDescriptionRow {
    #[serde(rename = "Job Description")]
    job_description: String,
}

#[derive(Debug, Deserialize)]
struct ResumeRow {
    #[serde(rename = "Resume")]
    resume: String,
}

/// Drop blank entries and repeats, keeping first occurrences in order.
fn dedup_non_blank(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Every job description paired with every resume, JD-major.
pub fn cross_pairs(job_descriptions: &[String], resumes: &[String]) -> Vec<PairRow> {
    job_descriptions
        .iter()
        .flat_map(|jd| {
            resumes.iter().map(move |resume| PairRow {
                job_description: jd.clone(),
                resume: resume.clone(),
            })
        })
        .collect()
}

/// Build the unlabeled pair list the completer consumes.
pub fn combine_tables(
    jds_path: &Path,
    resumes_path: &Path,
    output: &Path,
) -> Result<usize, CorpusError> {
    let jds: Vec<JobDescriptionRow> = read_rows(jds_path, &[JOB_DESCRIPTION_COLUMN])?;
    let resumes: Vec<ResumeRow> = read_rows(resumes_path, &[RESUME_COLUMN])?;

    let jds = dedup_non_blank(jds.into_iter().map(|r| r.job_description));
    let resumes = dedup_non_blank(resumes.into_iter().map(|r| r.resume));

    let pairs = cross_pairs(&jds, &resumes);
    write_rows_atomic(output, &[JD_COLUMN, RESUME_COLUMN], &pairs)?;

    info!(
        job_descriptions = jds.len(),
        resumes = resumes.len(),
        pairs = pairs.len(),
        output = %output.display(),
        "Combined pair list"
    );
    Ok(pairs.len())
}
