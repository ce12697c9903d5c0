//! [`TestTree`] builder for fragment tree test scenarios.
//!
//! Builds technology trees in a temporary directory using the marker-file
//! layout the scanner expects, with assertion helpers for the files the
//! pipeline produces.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary technology tree with helper methods for test setup and
/// assertion.
///
/// # Example
///
/// ```rust,no_run
/// use techpack_test_utils::TestTree;
///
/// let tree = TestTree::new();
/// tree.add_technology("spark", "id: spark\n");
/// tree.add_context("spark/ctx1", "id: \"2.4\"\n");
/// tree.assert_file_exists("spark/ctx1/context.yaml");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary tree.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write an arbitrary file relative to the root, creating parents.
    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
        full_path
    }

    /// Create a directory relative to the root.
    pub fn add_dir(&self, path: &str) -> PathBuf {
        let full_path = self.root().join(path);
        fs::create_dir_all(&full_path).unwrap();
        full_path
    }

    /// Create a technology subtree root with the given `technology.yaml`.
    pub fn add_technology(&self, dir: &str, content: &str) -> PathBuf {
        self.add_file(&format!("{dir}/technology.yaml"), content)
    }

    /// Create a top-level context with the given `context.yaml`.
    pub fn add_context(&self, dir: &str, content: &str) -> PathBuf {
        self.add_file(&format!("{dir}/context.yaml"), content)
    }

    /// Create an inner context with the given `innerContext.yaml`.
    pub fn add_inner_context(&self, dir: &str, content: &str) -> PathBuf {
        self.add_file(&format!("{dir}/innerContext.yaml"), content)
    }

    /// Place a `dockerInfo.yaml` fragment beside a context.
    pub fn add_docker_info(&self, dir: &str, content: &str) -> PathBuf {
        self.add_file(&format!("{dir}/dockerInfo.yaml"), content)
    }

    /// Read a file relative to the root.
    pub fn read(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to the root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let file_content = self.read(path);
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            path,
            content,
            file_content
        );
    }
}
