//! Error types shared by the evo-check crates
//!
//! Validators never surface these to their callers: a failure to read the
//! primary input is folded into a FAIL report. `EvoError` exists for the
//! library-level operations that genuinely can fail (loading configuration,
//! loading or saving snapshots, reading a whole file).

use std::path::PathBuf;

/// Errors raised by file-level operations
#[derive(Debug, thiserror::Error)]
pub enum EvoError {
    /// IO error while reading or writing a file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid JSON (or not the expected shape)
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be interpreted
    #[error("configuration error: {0}")]
    Config(String),

    /// Snapshot file is unusable
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl EvoError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create JSON error for path
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the file does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type alias for evo-check operations
pub type EvoResult<T> = Result<T, EvoError>;
