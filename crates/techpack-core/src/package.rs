//! Archive packager
//!
//! Stages every built metadata document plus only the files it references
//! into a staging tree, compresses the staged technology subtrees into
//! `technologies.zip`, and emits the docker listings (`docker_listing.json`
//! and `docker_listing.txt`) at the staging root.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use techpack_fs::{DocumentStore, NormalizedPath, io};
use techpack_meta::{Context, ListingEntry, TechnologyDescriptor, TechnologySubtree};

use crate::{Error, Result};

const ARCHIVE_NAME: &str = "technologies.zip";
const LISTING_JSON_NAME: &str = "docker_listing.json";
const LISTING_TEXT_NAME: &str = "docker_listing.txt";

/// Explicit packager configuration; no ambient lookups.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PackagerConfig {
    /// Staging tree root; outputs land here
    pub staging: NormalizedPath,
}

/// Paths of everything one packaging run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    pub archive: NormalizedPath,
    pub listing_json: NormalizedPath,
    pub listing_text: NormalizedPath,
}

/// Packages built technologies into a distributable archive.
pub struct ArchivePackager {
    config: PackagerConfig,
    store: DocumentStore,
}

impl ArchivePackager {
    pub fn new(config: PackagerConfig) -> Self {
        Self {
            config,
            store: DocumentStore::new(),
        }
    }

    /// Stage, archive, and list every technology with a materialized
    /// metadata document.
    ///
    /// Returns `None` without touching the filesystem when no technology
    /// has one — a no-op, not an error.
    pub fn package_all(
        &self,
        subtrees: &[TechnologySubtree],
    ) -> Result<Option<PackageOutput>> {
        let staged: Vec<(&TechnologySubtree, NormalizedPath)> = subtrees
            .iter()
            .filter_map(|subtree| subtree.metadata_file().map(|meta| (subtree, meta)))
            .collect();

        if staged.is_empty() {
            tracing::info!("no technology subtrees with metadata found, nothing to package");
            return Ok(None);
        }

        for (subtree, metadata) in &staged {
            self.stage_technology(subtree, metadata)?;
        }

        let archive = self.write_archive(&staged)?;
        let (listing_json, listing_text) = self.write_listings(&staged)?;

        tracing::info!(
            technologies = staged.len(),
            archive = %archive,
            "packaging complete"
        );
        Ok(Some(PackageOutput {
            archive,
            listing_json,
            listing_text,
        }))
    }

    /// Copy one technology's metadata and every file it references into
    /// the staging tree at the same relative locations.
    fn stage_technology(
        &self,
        subtree: &TechnologySubtree,
        metadata: &NormalizedPath,
    ) -> Result<()> {
        let staged_root = self.config.staging.join(&subtree.rel_root);
        let metadata_name = metadata.file_name().unwrap_or("metadata.yaml");
        io::copy_file(metadata, &staged_root.join(metadata_name))?;

        let descriptor: TechnologyDescriptor = self.store.load(metadata)?;
        for reference in referenced_files(&descriptor) {
            let rel_file = reference.trim_start_matches("./");
            let source = subtree.root.join(rel_file);
            if !source.is_file() {
                return Err(Error::MissingReferencedFile {
                    path: source.to_native(),
                });
            }
            io::copy_file(&source, &staged_root.join(rel_file))?;
            tracing::debug!(technology = %subtree.name, file = rel_file, "staged referenced file");
        }
        Ok(())
    }

    /// Compress the staged technology subtrees into a single archive.
    fn write_archive(
        &self,
        staged: &[(&TechnologySubtree, NormalizedPath)],
    ) -> Result<NormalizedPath> {
        let archive_path = self.config.staging.join(ARCHIVE_NAME);
        let file = File::create(archive_path.to_native())?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (subtree, _) in staged {
            let staged_root = self.config.staging.join(&subtree.rel_root);
            for entry in WalkDir::new(staged_root.to_native()).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = NormalizedPath::new(entry.path());
                let name = path
                    .strip_prefix(&self.config.staging)
                    .unwrap_or_default()
                    .to_string();
                zip.start_file(name, options)?;
                let bytes = std::fs::read(entry.path())?;
                zip.write_all(&bytes)?;
            }
        }

        zip.finish()?;
        Ok(archive_path)
    }

    /// Project every staged metadata document into listing entries and
    /// write the JSON and plain-text listings.
    fn write_listings(
        &self,
        staged: &[(&TechnologySubtree, NormalizedPath)],
    ) -> Result<(NormalizedPath, NormalizedPath)> {
        let mut entries = Vec::new();
        for (subtree, metadata) in staged {
            let descriptor: TechnologyDescriptor = self.store.load(metadata)?;
            entries.push(ListingEntry::project(&subtree.name, &descriptor));
        }

        let json_path = self.config.staging.join(LISTING_JSON_NAME);
        io::write_text(&json_path, &serde_json::to_string_pretty(&entries)?)?;

        // distinct references, first-seen order
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        for entry in &entries {
            for reference in entry.image_references() {
                if seen.insert(reference.to_string()) {
                    ordered.push(reference.to_string());
                }
            }
        }
        let text_path = self.config.staging.join(LISTING_TEXT_NAME);
        let mut text = ordered.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        io::write_text(&text_path, &text)?;

        Ok((json_path, text_path))
    }
}

/// Every file path a metadata document references: the icon plus all
/// parameter and action scripts, across contexts and nested inner
/// contexts, deduplicated.
pub(crate) fn referenced_files(descriptor: &TechnologyDescriptor) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    if let Some(icon) = &descriptor.icon_path {
        refs.insert(icon.clone());
    }
    for ctx in &descriptor.contexts {
        collect_context_refs(ctx, &mut refs);
    }
    refs
}

fn collect_context_refs(ctx: &Context, refs: &mut BTreeSet<String>) {
    for parameter in &ctx.parameters {
        if let Some(dynamic_values) = &parameter.dynamic_values
            && let Some(script) = &dynamic_values.script
        {
            refs.insert(script.clone());
        }
    }
    for action in &ctx.actions {
        if let Some(script) = &action.script {
            refs.insert(script.clone());
        }
    }
    for inner in ctx.inner_contexts.as_deref().unwrap_or_default() {
        collect_context_refs(inner, refs);
    }
}
