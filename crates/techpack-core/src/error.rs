//! Error types for techpack-core

use std::path::PathBuf;

/// Result type for techpack-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in techpack-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A script/icon path listed in metadata does not exist on disk
    #[error("Referenced file not found: {path}")]
    MissingReferencedFile { path: PathBuf },

    /// A registry pull/push exceeded its bounded wait
    #[error("Registry operation on {reference} timed out after {seconds}s")]
    RegistryTimeout { reference: String, seconds: u64 },

    /// A registry command exited unsuccessfully
    #[error("Registry command `{command}` failed: {message}")]
    RegistryCommand { command: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem/codec error from techpack-fs
    #[error(transparent)]
    Fs(#[from] techpack_fs::Error),

    /// Schema/scanner error from techpack-meta
    #[error(transparent)]
    Meta(#[from] techpack_meta::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Archive write error
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    /// Directory walk error while staging
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}
