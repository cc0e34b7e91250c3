use std::io;
use thiserror::Error;

/// Type Alias: A rebranding of the `Result` enum from the standard library which focuses on errors
/// that may result from improper use of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The `Error` enum generalizes every failure the simulation can surface. Translation itself only
/// ever fails with the first three variants; the remainder belong to construction and the file
/// replay harness.
#[derive(Debug, Error)]
pub enum Error {
    #[error("page {page} lies outside the configured address space of {max_page} pages")]
    OutOfRangeAddress { page: usize, max_page: usize },

    #[error("page {page} is not resident in physical memory")]
    NotResident { page: usize },

    #[error("backing store could not supply page {page}: {source}")]
    BackingStore {
        page: usize,
        #[source]
        source: io::Error,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed input on line {line}: {reason}")]
    Parse { line: u64, reason: String },
}
