//! Error types for the record store.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Errors reading or writing the persisted record file.
///
/// Per-record problems never surface here: a malformed entity entry is
/// logged and skipped so the rest of the file still loads. These variants
/// cover failures that stop the whole operation.
#[derive(Debug)]
pub enum StoreError {
    /// The file or its parent directory could not be read or written.
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The file exists but is not syntactically valid JSON.
    Format {
        /// Parser description of the syntax problem.
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "i/o failure on {}: {source}", path.display())
            }
            Self::Format { reason } => write!(f, "malformed record file: {reason}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Format { .. } => None,
        }
    }
}
