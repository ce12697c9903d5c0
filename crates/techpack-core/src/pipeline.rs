//! Pipeline control surface
//!
//! The operations a build host invokes, each a thin composition of the
//! scanner, builder, packager and promotion engine. Configuration is
//! explicit; nothing here reads the environment.

use serde::{Deserialize, Serialize};

use techpack_fs::NormalizedPath;
use techpack_meta::Scanner;

use crate::build::MetadataBuilder;
use crate::package::{ArchivePackager, PackageOutput, PackagerConfig};
use crate::promote::{DockerCliClient, PromotionEngine, RegistryAuth, RegistryClient};
use crate::Result;

/// Everything a pipeline run needs, passed in by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the technology fragment tree
    pub root: NormalizedPath,
    /// Staging tree for packaging outputs
    pub staging: NormalizedPath,
    /// Registry credentials; `None` relies on an existing daemon login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<RegistryAuth>,
}

/// Composition root for the packaging and promotion operations.
pub struct Pipeline {
    scanner: Scanner,
    builder: MetadataBuilder,
    packager: ArchivePackager,
    engine: PromotionEngine,
}

impl Pipeline {
    /// Pipeline backed by the `docker` CLI registry client.
    pub fn new(config: PipelineConfig) -> Self {
        let registry = DockerCliClient::new(config.auth.clone());
        Self::with_registry(config, Box::new(registry))
    }

    /// Pipeline with a caller-supplied registry client.
    pub fn with_registry(config: PipelineConfig, registry: Box<dyn RegistryClient>) -> Self {
        Self {
            scanner: Scanner::new(config.root.clone()),
            builder: MetadataBuilder::new(),
            packager: ArchivePackager::new(PackagerConfig {
                staging: config.staging.clone(),
            }),
            engine: PromotionEngine::new(config.root, registry),
        }
    }

    /// Build the metadata document for every technology subtree.
    ///
    /// Returns the written document paths in traversal order.
    pub fn aggregate_metadata(&self) -> Result<Vec<NormalizedPath>> {
        let mut written = Vec::new();
        for subtree in self.scanner.scan()? {
            written.push(self.builder.build(&subtree)?);
        }
        Ok(written)
    }

    /// Package the technologies whose metadata documents already exist.
    pub fn package_for_promotion(&self) -> Result<Option<PackageOutput>> {
        let subtrees = self.scanner.scan()?;
        self.packager.package_all(&subtrees)
    }

    /// Build every metadata document, then package.
    pub fn package_all(&self) -> Result<Option<PackageOutput>> {
        self.aggregate_metadata()?;
        self.package_for_promotion()
    }

    /// Rewrite pre-release version suffixes for `target` without touching
    /// the registry.
    pub fn fix_version(&self, target: &str) -> Result<()> {
        self.engine.fix_version(target)
    }

    /// Promote `target`: decide the registry work from the pre-rewrite
    /// documents, rewrite and repackage, then pull/tag/push.
    pub fn promote(&self, target: &str) -> Result<Option<PackageOutput>> {
        tracing::info!(%target, "starting promotion");
        let plan = self.engine.plan(target)?;
        self.engine.fix_version(target)?;
        let output = self.package_for_promotion()?;
        self.engine.execute(&plan)?;
        tracing::info!(%target, images = plan.actions.len(), "promotion complete");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use techpack_test_utils::TestTree;

    #[derive(Clone, Default)]
    struct RecordingRegistry {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RegistryClient for RecordingRegistry {
        fn pull(&self, reference: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("pull {reference}"));
            Ok(())
        }
        fn tag(&self, source: &str, image: &str, tag: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("tag {source} {image}:{tag}"));
            Ok(())
        }
        fn push(&self, reference: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("push {reference}"));
            Ok(())
        }
    }

    fn fragment_tree() -> TestTree {
        let tree = TestTree::new();
        tree.add_technology("spark", "id: spark\n");
        tree.add_context("spark/ctx1", "id: \"2.4\"\n");
        tree.add_docker_info(
            "spark/ctx1",
            "image: \"techno/spark\"\nbaseTag: \"2.4\"\nversion: \"1.0-5.0_abc123\"\n",
        );
        tree
    }

    fn pipeline_for(
        tree: &TestTree,
        staging: &std::path::Path,
    ) -> (Pipeline, Arc<Mutex<Vec<String>>>) {
        let registry = RecordingRegistry::default();
        let calls = registry.calls.clone();
        let config = PipelineConfig {
            root: NormalizedPath::new(tree.root()),
            staging: NormalizedPath::new(staging),
            auth: None,
        };
        (Pipeline::with_registry(config, Box::new(registry)), calls)
    }

    #[test]
    fn aggregate_metadata_builds_every_technology() {
        let tree = fragment_tree();
        tree.add_technology("zeppelin", "id: zeppelin\n");
        let staging = tempdir().unwrap();
        let (pipeline, _) = pipeline_for(&tree, staging.path());

        let written = pipeline.aggregate_metadata().unwrap();

        assert_eq!(written.len(), 2);
        tree.assert_file_exists("spark/metadata.yaml");
        tree.assert_file_exists("zeppelin/metadata.yaml");
    }

    #[test]
    fn package_all_builds_then_packages() {
        let tree = fragment_tree();
        let staging = tempdir().unwrap();
        let (pipeline, _) = pipeline_for(&tree, staging.path());

        let output = pipeline.package_all().unwrap().expect("packaged");

        assert!(output.archive.is_file());
        assert!(staging.path().join("spark/metadata.yaml").is_file());
    }

    #[test]
    fn package_for_promotion_without_built_metadata_is_a_noop() {
        let tree = fragment_tree();
        let staging = tempdir().unwrap();
        let (pipeline, _) = pipeline_for(&tree, staging.path());

        assert!(pipeline.package_for_promotion().unwrap().is_none());
    }

    #[test]
    fn promote_rewrites_repackages_and_drives_the_registry() {
        let tree = fragment_tree();
        let staging = tempdir().unwrap();
        let (pipeline, calls) = pipeline_for(&tree, staging.path());

        pipeline.aggregate_metadata().unwrap();
        let output = pipeline.promote("5.0+abc123").unwrap().expect("packaged");

        // the repackaged archive carries the rewritten version
        tree.assert_file_contains("spark/metadata.yaml", "version: \"1.0-5.0\"");
        let staged =
            std::fs::read_to_string(staging.path().join("spark/metadata.yaml")).unwrap();
        assert!(staged.contains("version: \"1.0-5.0\""));
        assert!(output.archive.is_file());

        // the registry saw the pre-release reference
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "pull techno/spark:2.4-1.0-5.0_abc123".to_string(),
                "tag techno/spark:2.4-1.0-5.0_abc123 techno/spark:2.4-5.0".to_string(),
                "push techno/spark:2.4-5.0".to_string(),
            ]
        );
    }

    #[test]
    fn fix_version_leaves_the_registry_untouched() {
        let tree = fragment_tree();
        let staging = tempdir().unwrap();
        let (pipeline, calls) = pipeline_for(&tree, staging.path());

        pipeline.aggregate_metadata().unwrap();
        pipeline.fix_version("5.0+abc123").unwrap();

        tree.assert_file_contains("spark/metadata.yaml", "version: \"1.0-5.0\"");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = PipelineConfig {
            root: NormalizedPath::new("/data/technos"),
            staging: NormalizedPath::new("/data/staging"),
            auth: Some(RegistryAuth {
                username: "ci".into(),
                password: "secret".into(),
            }),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root, config.root);
        assert_eq!(back.auth.unwrap().username, "ci");
    }
}
