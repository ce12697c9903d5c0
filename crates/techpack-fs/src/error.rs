//! Error types for techpack-fs

use std::path::PathBuf;

/// Result type for techpack-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in techpack-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} document at {path}: {message}")]
    Parse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} document for {path}: {message}")]
    Serialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// A string-typed field holds a raw scalar that parses as a number.
    ///
    /// `path` is the structural path from the document root, e.g.
    /// `contexts[0].dockerInfo.version`.
    #[error("Ambiguous numeric scalar `{token}` at {path}: quote the value to keep it a string")]
    AmbiguousScalar { path: String, token: String },

    #[error("Unsupported document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
