//! Filesystem layer for the technology packager
//!
//! Provides normalized path handling, safe I/O, the structured-document
//! codec, and the fragment tree marker constants.

pub mod codec;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use codec::DocumentStore;
pub use constants::TreeMarker;
pub use error::{Error, Result};
pub use path::NormalizedPath;
