//! End-to-end pipeline test: fragment tree in, archive and listings out.

use std::fs::File;
use std::io::Read;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use techpack_core::{Pipeline, PipelineConfig};
use techpack_fs::NormalizedPath;
use techpack_meta::TechnologyDescriptor;
use techpack_test_utils::TestTree;

/// A two-technology tree with nested inner contexts, scripts, and a
/// dependency cache that must be ignored.
fn sample_tree() -> TestTree {
    let tree = TestTree::new();

    tree.add_technology("spark", "id: spark\nlabel: Spark\niconPath: ./spark.png\n");
    tree.add_file("spark/spark.png", "png-bytes");
    tree.add_context(
        "spark/ctx1",
        "id: \"2.4\"\nactions:\n  - type: RUN\n    script: ./run.sh\n",
    );
    tree.add_file("spark/ctx1/run.sh", "echo run\n");
    tree.add_docker_info(
        "spark/ctx1",
        "image: \"techno/spark\"\nbaseTag: \"2.4\"\nversion: \"1.0-5.0_abc123\"\n",
    );
    tree.add_inner_context("spark/ctx1/innerContexts/in1", "id: inner\n");
    tree.add_docker_info(
        "spark/ctx1/innerContexts/in1",
        "image: \"techno/spark-inner\"\nbaseTag: \"2.4\"\nversion: \"1.0-5.0_abc123\"\n",
    );
    tree.add_context("spark/ctx2", "id: \"3.0\"\n");
    // must never be scanned
    tree.add_context("spark/node_modules/bogus", "id: bogus\n");

    tree.add_technology("zeppelin", "id: zeppelin\n");
    tree.add_context("zeppelin/ctxA", "id: a\n");

    tree
}

fn pipeline(tree: &TestTree, staging: &std::path::Path) -> Pipeline {
    Pipeline::new(PipelineConfig {
        root: NormalizedPath::new(tree.root()),
        staging: NormalizedPath::new(staging),
        auth: None,
    })
}

#[test]
fn aggregate_produces_parseable_ordered_metadata() {
    let tree = sample_tree();
    let staging = tempdir().unwrap();

    let written = pipeline(&tree, staging.path()).aggregate_metadata().unwrap();
    assert_eq!(written.len(), 2);

    let merged = tree.read("spark/metadata.yaml");
    let descriptor: TechnologyDescriptor = serde_yaml::from_str(&merged).unwrap();

    // contexts in lexicographic fragment order, inner nested under its parent
    assert_eq!(descriptor.contexts.len(), 2);
    assert_eq!(descriptor.contexts[0].id.as_deref(), Some("2.4"));
    assert_eq!(descriptor.contexts[1].id.as_deref(), Some("3.0"));
    let inner = descriptor.contexts[0].inner_contexts.as_ref().unwrap();
    assert_eq!(inner[0].id.as_deref(), Some("inner"));

    // script paths rewritten to technology-root-relative
    assert_eq!(
        descriptor.contexts[0].actions[0].script.as_deref(),
        Some("./ctx1/run.sh")
    );

    // docker info injected with its fragment values
    let info = descriptor.contexts[0].docker_info.as_ref().unwrap();
    assert_eq!(info.reference(), "techno/spark:2.4-1.0-5.0_abc123");

    // the dependency cache contributed nothing
    assert!(!merged.contains("bogus"));
}

#[test]
fn aggregate_is_stable_across_reruns() {
    let tree = sample_tree();
    let staging = tempdir().unwrap();
    let pipeline = pipeline(&tree, staging.path());

    pipeline.aggregate_metadata().unwrap();
    let first = tree.read("spark/metadata.yaml");
    pipeline.aggregate_metadata().unwrap();
    let second = tree.read("spark/metadata.yaml");

    assert_eq!(first, second);
}

#[test]
fn package_all_stages_archives_and_lists() {
    let tree = sample_tree();
    let staging = tempdir().unwrap();

    let output = pipeline(&tree, staging.path())
        .package_all()
        .unwrap()
        .expect("technologies packaged");

    // staging mirrors each technology's metadata and referenced files
    assert!(staging.path().join("spark/metadata.yaml").is_file());
    assert!(staging.path().join("spark/spark.png").is_file());
    assert!(staging.path().join("spark/ctx1/run.sh").is_file());
    assert!(staging.path().join("zeppelin/metadata.yaml").is_file());

    // the archive holds the staged trees under technology-relative names
    let mut archive = zip::ZipArchive::new(File::open(output.archive.to_native()).unwrap()).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "spark/ctx1/run.sh",
            "spark/metadata.yaml",
            "spark/spark.png",
            "zeppelin/metadata.yaml",
        ]
    );
    let mut staged_metadata = String::new();
    archive
        .by_name("spark/metadata.yaml")
        .unwrap()
        .read_to_string(&mut staged_metadata)
        .unwrap();
    assert_eq!(staged_metadata, tree.read("spark/metadata.yaml"));

    // listings cover every image reference, once
    let json = std::fs::read_to_string(output.listing_json.to_native()).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(entries[0]["technology"], "spark");
    assert_eq!(entries[1]["technology"], "zeppelin");
    assert_eq!(
        entries[0]["contexts"][0]["docker"],
        "techno/spark:2.4-1.0-5.0_abc123"
    );
    assert_eq!(
        entries[0]["contexts"][0]["innerContexts"][0]["docker"],
        "techno/spark-inner:2.4-1.0-5.0_abc123"
    );

    let text = std::fs::read_to_string(output.listing_text.to_native()).unwrap();
    assert_eq!(
        text,
        "techno/spark:2.4-1.0-5.0_abc123\ntechno/spark-inner:2.4-1.0-5.0_abc123\n"
    );
}

#[test]
fn empty_root_packages_nothing() {
    let tree = TestTree::new();
    let staging = tempdir().unwrap();

    let output = pipeline(&tree, staging.path()).package_all().unwrap();

    assert!(output.is_none());
    assert!(!staging.path().join("technologies.zip").exists());
}
