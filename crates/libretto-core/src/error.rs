//! Error types for libretto-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for export operations
#[derive(Error, Debug)]
pub enum Error {
    /// The server rejected the token (401/403). Never retried.
    #[error("Authentication rejected by server (HTTP {status}); check the token")]
    Auth { status: u16 },

    /// Connection failure, timeout or 429/5xx that outlasted the retry budget.
    #[error("Request to {path} failed after {attempts} attempt(s): {message}")]
    Transient {
        path: String,
        attempts: u32,
        message: String,
    },

    #[error("Server returned HTTP {status} for {path}")]
    HttpStatus { path: String, status: u16 },

    #[error("Malformed response from {context}: {message}")]
    Decode { context: String, message: String },

    #[error("Output file {0} already exists (use --force to overwrite)")]
    DestinationExists(PathBuf),

    #[error(
        "Another export is already running for this target (pid {pid}); \
         wait for it to finish or remove the stale lock {lock_path}"
    )]
    AlreadyRunning { lock_path: PathBuf, pid: u32 },

    /// A page fetch failed mid-pagination. The export is incomplete.
    #[error("Failed to fetch page of library '{section}' at offset {offset}: {source}")]
    PageFetch {
        section: String,
        offset: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    #[error("Unsupported library type '{kind}' for library '{section}'")]
    UnsupportedLibrary { section: String, kind: String },

    #[error("Row has {actual} fields but the {schema} schema has {expected}")]
    RowWidth {
        schema: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The innermost error, looking through `PageFetch` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::PageFetch { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error means every further request will fail the same way.
    pub fn is_auth(&self) -> bool {
        matches!(self.root(), Error::Auth { .. })
    }
}

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_page_fetch() {
        let err = Error::PageFetch {
            section: "Movies".to_string(),
            offset: 50,
            source: Box::new(Error::Auth { status: 401 }),
        };
        assert!(err.is_auth());
        assert!(matches!(err.root(), Error::Auth { status: 401 }));

        let message = err.to_string();
        assert!(message.contains("Movies"));
        assert!(message.contains("offset 50"));
    }
}
