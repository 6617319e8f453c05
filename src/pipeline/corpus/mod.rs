//! Dataset preparation around the completer: turning a folder of documents
//! into a text table, and pairing job descriptions with resumes.

pub mod formatter;
pub mod combine;

pub use formatter::*;
pub use combine::*;

use std::path::PathBuf;

use thiserror::Error;

use super::table::TableError;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Cannot read input directory {path}: {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}
