//! Shared test utilities for the techpack workspace

pub mod tree;

pub use tree::TestTree;
