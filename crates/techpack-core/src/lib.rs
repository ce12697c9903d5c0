//! Core orchestration layer for the technology packager
//!
//! Coordinates the layer 0/1 crates into the pipeline operations a build
//! host invokes:
//!
//! - **Metadata builder**: merges fragment trees into `metadata.yaml`
//! - **Archive packager**: stages metadata plus referenced files and
//!   produces `technologies.zip` with docker listings
//! - **Promotion engine**: rewrites pre-release version suffixes and
//!   drives pull/tag/push against a container registry
//!
//! # Architecture
//!
//! ```text
//!            build host (task graph)
//!                     |
//!               techpack-core
//!                     |
//!          +----------+----------+
//!          |                     |
//!     techpack-fs          techpack-meta
//! ```

pub mod build;
pub mod error;
pub mod logging;
pub mod package;
pub mod pipeline;
pub mod promote;

pub use build::MetadataBuilder;
pub use error::{Error, Result};
pub use package::{ArchivePackager, PackageOutput, PackagerConfig};
pub use pipeline::{Pipeline, PipelineConfig};
pub use promote::{
    DockerCliClient, PromotionAction, PromotionEngine, PromotionPlan, RegistryAuth,
    RegistryClient,
};
