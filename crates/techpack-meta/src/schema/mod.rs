//! Schema types for technology metadata documents

mod listing;
mod technology;

pub use listing::{ListingContext, ListingEntry};
pub use technology::{Action, Context, DockerInfo, DynamicValues, Parameter, TechnologyDescriptor};
