//! End-to-end promotion test: build, promote, verify rewrites and
//! registry traffic.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use techpack_core::{Pipeline, PipelineConfig, Result};
use techpack_core::RegistryClient;
use techpack_fs::NormalizedPath;
use techpack_test_utils::TestTree;

const TARGET: &str = "5.0+abc123";

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

fn sample_tree() -> TestTree {
    let tree = TestTree::new();
    tree.add_technology("spark", "id: spark\n");
    tree.add_context("spark/ctx1", "id: \"2.4\"\n");
    tree.add_docker_info(
        "spark/ctx1",
        "image: \"techno/spark\"\nbaseTag: \"2.4\"\nversion: \"1.0-5.0_abc123\"\n",
    );
    tree.add_inner_context("spark/ctx1/innerContexts/in1", "id: inner\n");
    tree.add_docker_info(
        "spark/ctx1/innerContexts/in1",
        "image: \"techno/inner\"\nbaseTag: \"1\"\nversion: \"2.0-5.0_abc123\"\n",
    );
    tree.add_context("spark/ctx2", "id: \"3.0\"\n");
    tree.add_docker_info(
        "spark/ctx2",
        "image: \"techno/other\"\nbaseTag: \"1\"\nversion: \"0.9-older\"\n",
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
fn promote_rewrites_repackages_and_pushes_matching_images() {
    let tree = sample_tree();
    let staging = tempdir().unwrap();
    let (pipeline, calls) = pipeline_for(&tree, staging.path());

    pipeline.aggregate_metadata().unwrap();
    let output = pipeline.promote(TARGET).unwrap().expect("repackaged");

    // matching versions rewritten, the non-matching one untouched
    let metadata = tree.read("spark/metadata.yaml");
    assert!(metadata.contains("version: \"1.0-5.0\""));
    assert!(metadata.contains("version: \"2.0-5.0\""));
    assert!(metadata.contains("version: \"0.9-older\""));
    assert!(!metadata.contains("abc123"));

    // source fragments rewritten too
    tree.assert_file_contains("spark/ctx1/dockerInfo.yaml", "version: \"1.0-5.0\"");
    tree.assert_file_contains(
        "spark/ctx1/innerContexts/in1/dockerInfo.yaml",
        "version: \"2.0-5.0\"",
    );
    tree.assert_file_contains("spark/ctx2/dockerInfo.yaml", "version: \"0.9-older\"");

    // the repackaged staging tree carries the rewritten document
    let staged = std::fs::read_to_string(staging.path().join("spark/metadata.yaml")).unwrap();
    assert_eq!(staged, metadata);
    assert!(output.archive.is_file());

    // pre-release references pulled, release references pushed, in
    // document order, only for matching images
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "pull techno/spark:2.4-1.0-5.0_abc123".to_string(),
            "tag techno/spark:2.4-1.0-5.0_abc123 techno/spark:2.4-5.0".to_string(),
            "push techno/spark:2.4-5.0".to_string(),
            "pull techno/inner:1-2.0-5.0_abc123".to_string(),
            "tag techno/inner:1-2.0-5.0_abc123 techno/inner:1-5.0".to_string(),
            "push techno/inner:1-5.0".to_string(),
        ]
    );
}

#[test]
fn fix_version_is_idempotent_end_to_end() {
    let tree = sample_tree();
    let staging = tempdir().unwrap();
    let (pipeline, calls) = pipeline_for(&tree, staging.path());

    pipeline.aggregate_metadata().unwrap();

    pipeline.fix_version(TARGET).unwrap();
    let first = tree.read("spark/metadata.yaml");
    let first_fragment = tree.read("spark/ctx1/dockerInfo.yaml");

    pipeline.fix_version(TARGET).unwrap();
    assert_eq!(tree.read("spark/metadata.yaml"), first);
    assert_eq!(tree.read("spark/ctx1/dockerInfo.yaml"), first_fragment);

    // fix_version never touches the registry
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn promote_with_no_matching_versions_does_nothing_at_the_registry() {
    let tree = TestTree::new();
    tree.add_technology("spark", "id: spark\n");
    tree.add_context("spark/ctx1", "id: \"2.4\"\n");
    tree.add_docker_info(
        "spark/ctx1",
        "image: \"techno/spark\"\nbaseTag: \"2.4\"\nversion: \"0.9-older\"\n",
    );
    let staging = tempdir().unwrap();
    let (pipeline, calls) = pipeline_for(&tree, staging.path());

    pipeline.aggregate_metadata().unwrap();
    let before = tree.read("spark/metadata.yaml");
    pipeline.promote(TARGET).unwrap();

    assert_eq!(tree.read("spark/metadata.yaml"), before);
    assert!(calls.lock().unwrap().is_empty());
}
