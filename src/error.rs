//! Errors returned by [`load_archive`](crate::load_archive).

use std::path::PathBuf;
use thiserror::Error;

/// Failure while loading an archive.
///
/// Either kind ends the load; no partial results are returned.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The archive is missing, unreadable, or not a valid zip file.
    #[error("Cannot open archive '{}': {source:#}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A retained entry could not be opened or fully decompressed.
    #[error("Cannot read entry '{name}': {source:#}")]
    Read {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LoadError {
    pub fn is_open(&self) -> bool {
        matches!(self, LoadError::Open { .. })
    }

    pub fn is_read(&self) -> bool {
        matches!(self, LoadError::Read { .. })
    }
}
