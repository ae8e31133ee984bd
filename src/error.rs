use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors of which majority are related to I/O issues, incorrect file format or invalid parameters
pub enum Error {
    #[error("Could not read FASTQ file")]
    /// Could not read lines from a fastq file or write an output
    IoError(#[from] std::io::Error),
    #[error("Could not open FASTQ file")]
    /// Could not open or detect compression of the input
    OpenError(#[from] niffler::Error),
    #[error("File {0} does not exist or is not a regular file")]
    /// Path does not resolve to a regular file
    FileNotFound(PathBuf),
    #[error("File {0} is empty")]
    /// Input file contains no data
    EmptyFile(PathBuf),
    #[error("File {0} does not have a .fastq extension")]
    /// Input does not look like a FASTQ file
    NotFastq(PathBuf),
    #[error("Malformed FASTQ record {record}: {reason}")]
    /// Record inside an otherwise readable file is malformed
    Format {
        /// 1-based index of the offending record
        record: usize,
        /// What was wrong with it
        reason: String,
    },
    #[error("Invalid parameter: {0}")]
    /// Parameter has the wrong range or shape
    Validation(String),
    #[error("Value {0} not found in the searched array")]
    /// Binary search did not find the target
    TargetNotFound(String),
    #[error("Search exceeded the maximum of {0} rounds, input is likely unsorted")]
    /// Binary search hit its round cap
    IterationLimit(usize),
    #[error("Could not spawn threads")]
    /// Create thread pools erorr
    ThreadError,
}

impl Error {
    pub(crate) fn format<T: Into<String>>(record: usize, reason: T) -> Self {
        Error::Format {
            record,
            reason: reason.into(),
        }
    }

    pub(crate) fn validation<T: Into<String>>(msg: T) -> Self {
        Error::Validation(msg.into())
    }

    /// Attaches the 1-based record index to a format error
    pub(crate) fn at_record(self, record: usize) -> Self {
        match self {
            Error::Format { reason, .. } => Error::Format { record, reason },
            other => other,
        }
    }
}
