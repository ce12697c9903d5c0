//! Fragment tree scanner
//!
//! Walks a root directory, finds technology subtrees (marked by
//! `technology.yaml`), and within each discovers the ordered context
//! fragments the builder merges. Traversal is lexicographic by path so the
//! merged output is reproducible across runs; dependency-cache directories
//! are never descended into.
//!
//! Directory semantics are derived once, through [`classify`], instead of
//! re-checking marker files at each call site.

use walkdir::WalkDir;

use techpack_fs::{NormalizedPath, TreeMarker};

use crate::Result;

/// Classification of one directory inside a technology tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    /// Directly contains `technology.yaml`
    TechnologyRoot,
    /// Directly contains `context.yaml`, outside any `innerContexts` segment
    TopLevelContext,
    /// Contains a context marker under `depth` nested `innerContexts` segments
    InnerContext { depth: usize },
    /// An `innerContexts` directory itself
    InnerContextsDir { depth: usize },
    /// No marker semantics
    Leaf,
}

/// One step of the merge sequence for a technology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeItem {
    /// A context fragment to splice into the `contexts:` block
    Context {
        /// Fragment directory, relative to the technology root
        rel_dir: String,
        /// The context marker file to splice
        context_file: NormalizedPath,
        /// 0 = top-level, 1 = inner, 2 = inner-within-inner
        depth: usize,
        /// `dockerInfo.yaml` beside the context, when present
        docker_info: Option<NormalizedPath>,
    },
    /// An `innerContexts:` block header
    InnerContextsHeader { depth: usize },
}

/// A discovered technology subtree with its ordered merge sequence.
#[derive(Debug, Clone)]
pub struct TechnologySubtree {
    /// Technology directory name
    pub name: String,
    /// Technology directory, relative to the scan root
    pub rel_root: String,
    /// Absolute technology directory
    pub root: NormalizedPath,
    /// The base `technology.yaml` document
    pub base_file: NormalizedPath,
    /// Context fragments and headers, in lexicographic path order
    pub items: Vec<MergeItem>,
}

impl TechnologySubtree {
    /// The materialized metadata document, if one exists.
    ///
    /// `metadata.yaml` is preferred; `metadata.yml` is accepted.
    pub fn metadata_file(&self) -> Option<NormalizedPath> {
        for marker in [TreeMarker::Metadata, TreeMarker::MetadataAlt] {
            let candidate = self.root.join(marker.as_str());
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

/// Classify a directory from its marker files and relative location.
///
/// `rel_to_technology` is the directory's path relative to the technology
/// root (empty for the root itself).
pub fn classify(dir: &NormalizedPath, rel_to_technology: &str) -> DirectoryKind {
    if dir.join(TreeMarker::Technology.as_str()).is_file() {
        return DirectoryKind::TechnologyRoot;
    }

    let inner_depth = rel_to_technology
        .split('/')
        .filter(|segment| *segment == TreeMarker::InnerContextsDir.as_str())
        .count();

    if dir.file_name() == Some(TreeMarker::InnerContextsDir.as_str()) {
        return DirectoryKind::InnerContextsDir { depth: inner_depth };
    }

    let has_context = dir.join(TreeMarker::Context.as_str()).is_file();
    let has_inner_context = dir.join(TreeMarker::InnerContext.as_str()).is_file();

    if inner_depth > 0 {
        if has_inner_context || has_context {
            return DirectoryKind::InnerContext { depth: inner_depth };
        }
    } else if has_context {
        return DirectoryKind::TopLevelContext;
    }

    DirectoryKind::Leaf
}

/// Scanner over a root technology tree.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: NormalizedPath,
}

impl Scanner {
    pub fn new(root: NormalizedPath) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Discover every technology subtree under the root, in lexicographic
    /// path order, each with its ordered merge sequence.
    pub fn scan(&self) -> Result<Vec<TechnologySubtree>> {
        let mut subtrees = Vec::new();

        for entry in sorted_walk(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = NormalizedPath::new(entry.path());
            if !dir.join(TreeMarker::Technology.as_str()).is_file() {
                continue;
            }

            let rel_root = dir
                .strip_prefix(&self.root)
                .unwrap_or_default()
                .to_string();
            let name = dir.file_name().unwrap_or_default().to_string();
            tracing::debug!(technology = %name, "discovered technology subtree");

            let items = self.scan_subtree(&dir)?;
            subtrees.push(TechnologySubtree {
                name,
                rel_root,
                base_file: dir.join(TreeMarker::Technology.as_str()),
                root: dir,
                items,
            });
        }

        tracing::info!(count = subtrees.len(), root = %self.root, "fragment tree scan complete");
        Ok(subtrees)
    }

    /// Every standalone `dockerInfo.yaml` fragment under the root, in
    /// lexicographic path order.
    pub fn docker_fragments(&self) -> Result<Vec<NormalizedPath>> {
        let mut fragments = Vec::new();
        for entry in sorted_walk(&self.root) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.file_name() == TreeMarker::DockerInfo.as_str()
            {
                fragments.push(NormalizedPath::new(entry.path()));
            }
        }
        Ok(fragments)
    }

    /// Collect the ordered merge sequence for one technology subtree.
    ///
    /// An `innerContexts:` header is held pending until a fragment at its
    /// depth follows it; an empty `innerContexts` directory emits nothing.
    fn scan_subtree(&self, tech_root: &NormalizedPath) -> Result<Vec<MergeItem>> {
        let mut items = Vec::new();
        let mut pending_header: Option<usize> = None;

        for entry in sorted_walk(tech_root).min_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = NormalizedPath::new(entry.path());
            let rel_dir = dir
                .strip_prefix(tech_root)
                .unwrap_or_default()
                .to_string();

            match classify(&dir, &rel_dir) {
                DirectoryKind::TopLevelContext => {
                    pending_header = None;
                    items.push(self.context_item(&dir, rel_dir, 0));
                }
                DirectoryKind::InnerContext { depth } => {
                    if let Some(header_depth) = pending_header.take() {
                        items.push(MergeItem::InnerContextsHeader {
                            depth: header_depth,
                        });
                    }
                    items.push(self.context_item(&dir, rel_dir, depth));
                }
                DirectoryKind::InnerContextsDir { depth } => {
                    pending_header = Some(depth);
                }
                DirectoryKind::TechnologyRoot | DirectoryKind::Leaf => {}
            }
        }

        Ok(items)
    }

    fn context_item(&self, dir: &NormalizedPath, rel_dir: String, depth: usize) -> MergeItem {
        let inner_marker = dir.join(TreeMarker::InnerContext.as_str());
        let context_file = if depth > 0 && inner_marker.is_file() {
            inner_marker
        } else {
            dir.join(TreeMarker::Context.as_str())
        };

        let docker_marker = dir.join(TreeMarker::DockerInfo.as_str());
        let docker_info = docker_marker.is_file().then_some(docker_marker);

        MergeItem::Context {
            rel_dir,
            context_file,
            depth,
            docker_info,
        }
    }
}

/// Lexicographic walk with dependency-cache pruning.
fn sorted_walk(root: &NormalizedPath) -> WalkDirIter {
    WalkDirIter {
        inner: WalkDir::new(root.to_native()).sort_by_file_name(),
    }
}

/// Thin wrapper so callers can chain walkdir options before iterating.
struct WalkDirIter {
    inner: WalkDir,
}

impl WalkDirIter {
    fn min_depth(self, depth: usize) -> Self {
        Self {
            inner: self.inner.min_depth(depth),
        }
    }
}

impl IntoIterator for WalkDirIter {
    type Item = walkdir::Result<walkdir::DirEntry>;
    type IntoIter = walkdir::FilterEntry<walkdir::IntoIter, fn(&walkdir::DirEntry) -> bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner
            .into_iter()
            .filter_entry(not_dependency_cache as fn(&walkdir::DirEntry) -> bool)
    }
}

fn not_dependency_cache(entry: &walkdir::DirEntry) -> bool {
    entry.file_name() != TreeMarker::DependencyCacheDir.as_str()
}
