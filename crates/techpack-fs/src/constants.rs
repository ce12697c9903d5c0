//! Marker files and reserved directory names of the fragment tree.

use std::path::Path;

/// File and directory names that drive fragment tree classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMarker {
    /// `technology.yaml` — marks a technology subtree root
    Technology,
    /// `context.yaml` — marks a top-level execution context
    Context,
    /// `innerContext.yaml` — marks a nested execution context
    InnerContext,
    /// `dockerInfo.yaml` — container image descriptor beside a context
    DockerInfo,
    /// `metadata.yaml` — the merged output document
    Metadata,
    /// `metadata.yml` — alternate extension for the merged output
    MetadataAlt,
    /// `innerContexts` — directory holding nested contexts
    InnerContextsDir,
    /// `node_modules` — dependency cache, pruned from traversal
    DependencyCacheDir,
}

impl TreeMarker {
    /// Get the string representation of the marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "technology.yaml",
            Self::Context => "context.yaml",
            Self::InnerContext => "innerContext.yaml",
            Self::DockerInfo => "dockerInfo.yaml",
            Self::Metadata => "metadata.yaml",
            Self::MetadataAlt => "metadata.yml",
            Self::InnerContextsDir => "innerContexts",
            Self::DependencyCacheDir => "node_modules",
        }
    }
}

impl AsRef<Path> for TreeMarker {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for TreeMarker {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for TreeMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
