use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a scan. There is no recovery: any of these means the
/// run produced no number worth reporting.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Error opening file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error getting file size '{}': {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error mmapping the file '{}': {source}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file '{}' is {size} bytes, too large to map on this platform", path.display())]
    TooLarge { path: PathBuf, size: u64 },

    #[error("chunk size must be a non-zero multiple of 8, got {0}")]
    ChunkSize(usize),
}

impl ScanError {
    /// The underlying OS error, if this failure came from one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            ScanError::Open { source, .. }
            | ScanError::Metadata { source, .. }
            | ScanError::Map { source, .. } => Some(source),
            ScanError::TooLarge { .. } | ScanError::ChunkSize(_) => None,
        }
    }
}
