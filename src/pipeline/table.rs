//! CSV tables shared by every stage: pair lists, label output, text corpora.
//!
//! Writes never touch the target in place. Rows go to a temp file in the
//! same directory which is then renamed over the target, so a crash leaves
//! either the previous table or the new one.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },
}

impl TableError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read every row of a headed CSV, checking `required` columns exist first.
/// Extra columns are ignored.
pub fn read_rows<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>, TableError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| TableError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| TableError::csv(path, e))?;
    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(TableError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| TableError::csv(path, e))
}

/// Replace `path` with a table holding `header` and `rows`, atomically.
///
/// The header is written even when `rows` is empty.
pub fn write_rows_atomic<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: &[T],
) -> Result<(), TableError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| TableError::io(path, e))?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(staged.as_file_mut());
        writer
            .write_record(header)
            .map_err(|e| TableError::csv(path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| TableError::csv(path, e))?;
        }
        writer.flush().map_err(|e| TableError::io(path, e))?;
    }

    staged
        .as_file()
        .sync_all()
        .map_err(|e| TableError::io(path, e))?;
    staged
        .persist(path)
        .map_err(|e| TableError::io(path, e.error))?;
    Ok(())
}
