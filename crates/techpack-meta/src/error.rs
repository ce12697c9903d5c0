//! Error types for techpack-meta

use std::path::PathBuf;

/// Result type for techpack-meta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in techpack-meta operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fragment file is missing, unreadable, or has the wrong extension.
    /// Fatal to the enclosing technology's build.
    #[error("Malformed fragment at {path}: {reason}")]
    MalformedFragment { path: PathBuf, reason: String },

    #[error("Failed to walk fragment tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Filesystem or codec error from techpack-fs
    #[error(transparent)]
    Fs(#[from] techpack_fs::Error),
}
