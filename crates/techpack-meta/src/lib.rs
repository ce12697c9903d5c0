//! Metadata schema and fragment tree scanning
//!
//! The schema types model the merged technology metadata documents; the
//! scanner walks a technology tree and produces the ordered fragment
//! sequence the builder merges.

pub mod error;
pub mod scanner;
pub mod schema;

pub use error::{Error, Result};
pub use scanner::{DirectoryKind, MergeItem, Scanner, TechnologySubtree, classify};
pub use schema::{
    Action, Context, DockerInfo, DynamicValues, ListingContext, ListingEntry, Parameter,
    TechnologyDescriptor,
};
